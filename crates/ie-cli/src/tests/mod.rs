mod relations;
