use ie_core::{ImportExportError, Result};

/// Validation progress of one archive.
///
/// States only move forward one step at a time. `Rejected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Unvalidated,
    SizeChecked,
    StructureChecked,
    VersionChecked,
    Trusted,
    Rejected,
}

impl ArchiveState {
    pub fn successor(self) -> Option<ArchiveState> {
        match self {
            Self::Unvalidated => Some(Self::SizeChecked),
            Self::SizeChecked => Some(Self::StructureChecked),
            Self::StructureChecked => Some(Self::VersionChecked),
            Self::VersionChecked => Some(Self::Trusted),
            Self::Trusted | Self::Rejected => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Trusted | Self::Rejected)
    }

    #[track_caller]
    pub fn advance(&mut self, to: ArchiveState) -> Result<()> {
        if self.successor() != Some(to) {
            return Err(ImportExportError::archive_invalid(format!(
                "illegal archive state transition {:?} -> {:?}",
                self, to
            )));
        }
        *self = to;
        Ok(())
    }

    pub fn reject(&mut self) {
        *self = Self::Rejected;
    }
}

impl std::fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unvalidated => "unvalidated",
            Self::SizeChecked => "size_checked",
            Self::StructureChecked => "structure_checked",
            Self::VersionChecked => "version_checked",
            Self::Trusted => "trusted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
