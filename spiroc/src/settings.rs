//! Settings resolved from the environment of a WAGASCI installation
use crate::core::ChipKind;
use spiroc_utils::layout::{
    parse_layout,
    read_layout_file,
    Error,
    Layout,
};
use std::path::PathBuf;
use tracing::debug;

/// Root of the WAGASCI software installation
pub const MAINDIR_VAR: &str = "WAGASCI_MAINDIR";
/// Path of the DIF mapping file
pub const DIF_MAPPING_VAR: &str = "WAGASCI_DIF_MAPPING";
pub const DEFAULT_DIF_MAPPING: &str = "/opt/calicoes/config/dif_mapping.txt";

const SPIROC2B_LAYOUT: &str = include_str!("../layouts/spiroc2b.csv");
const SPIROC2D_LAYOUT: &str = include_str!("../layouts/spiroc2d.csv");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Where to look for `configs/<chip>/<chip>.csv`. The built-in tables are used if unset.
    pub maindir: Option<PathBuf>,
    pub dif_mapping: PathBuf,
}

impl Settings {
    /// Read the settings from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var_os(MAINDIR_VAR).map(PathBuf::from),
            std::env::var_os(DIF_MAPPING_VAR).map(PathBuf::from),
        )
    }

    #[must_use]
    pub fn from_vars(maindir: Option<PathBuf>, dif_mapping: Option<PathBuf>) -> Self {
        Self {
            maindir: maindir.filter(|p| !p.as_os_str().is_empty()),
            dif_mapping: dif_mapping.unwrap_or_else(|| PathBuf::from(DEFAULT_DIF_MAPPING)),
        }
    }

    /// Location of the on-disk layout table of `kind`, if a main directory is configured
    #[must_use]
    pub fn layout_path(&self, kind: ChipKind) -> Option<PathBuf> {
        self.maindir.as_ref().map(|dir| {
            dir.join("configs")
                .join(kind.name())
                .join(format!("{}.csv", kind.name()))
        })
    }

    /// Load the register-layout table of `kind`
    /// # Errors
    /// Returns an error if the table can not be read or parsed, or if its sub-addresses are not
    /// the contiguous offsets of its rows
    pub fn layout(&self, kind: ChipKind) -> Result<Layout, Error> {
        let layout = match self.layout_path(kind) {
            Some(path) => {
                debug!(?path, "Reading layout table");
                read_layout_file(path)?
            }
            None => builtin_layout(kind)?,
        };
        layout.check_contiguous()?;
        Ok(layout)
    }

    /// The DIF mapping file, only if it exists
    #[must_use]
    pub fn dif_mapping_file(&self) -> Option<&PathBuf> {
        self.dif_mapping.is_file().then_some(&self.dif_mapping)
    }
}

/// The layout table shipped with this crate
/// # Errors
/// Returns an error if the built-in table is malformed
pub fn builtin_layout(kind: ChipKind) -> Result<Layout, Error> {
    parse_layout(match kind {
        ChipKind::Spiroc2b => SPIROC2B_LAYOUT,
        ChipKind::Spiroc2d => SPIROC2D_LAYOUT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use paste::paste;
    use std::path::Path;

    macro_rules! test_builtin {
        ($chip:ident) => {
            paste! {
                #[test]
                fn [<test_builtin_layout_ $chip:lower>]() {
                    let kind = ChipKind::$chip;
                    let layout = builtin_layout(kind).unwrap();
                    assert_eq!(layout.len(), kind.layout_rows());
                    assert_eq!(layout.total_bits() + kind.margin_bits(), kind.total_bits());
                    layout.check_contiguous().unwrap();
                }
            }
        };
    }

    test_builtin!(Spiroc2b);
    test_builtin!(Spiroc2d);

    #[test]
    fn test_defaults() {
        let settings = Settings::from_vars(None, None);
        assert_eq!(settings.maindir, None);
        assert_eq!(settings.dif_mapping, Path::new(DEFAULT_DIF_MAPPING));
        assert_eq!(settings.layout_path(ChipKind::Spiroc2d), None);
    }

    #[test]
    fn test_layout_path() {
        let settings = Settings::from_vars(Some("/opt/wagasci".into()), None);
        assert_eq!(
            settings.layout_path(ChipKind::Spiroc2b).unwrap(),
            Path::new("/opt/wagasci/configs/spiroc2b/spiroc2b.csv")
        );
    }

    #[test]
    fn test_layout_from_maindir() {
        let dir = tempfile::tempdir().unwrap();
        let chip_dir = dir.path().join("configs").join("spiroc2d");
        std::fs::create_dir_all(&chip_dir).unwrap();
        std::fs::write(chip_dir.join("spiroc2d.csv"), "a,4,,0,3\nb,2,,4,1\n").unwrap();
        let settings = Settings::from_vars(Some(dir.path().into()), None);
        let layout = settings.layout(ChipKind::Spiroc2d).unwrap();
        assert_eq!(layout.len(), 2);
        assert!(settings.layout(ChipKind::Spiroc2b).is_err());
    }

    #[test]
    fn test_discontiguous_layout_from_maindir() {
        let dir = tempfile::tempdir().unwrap();
        let chip_dir = dir.path().join("configs").join("spiroc2d");
        std::fs::create_dir_all(&chip_dir).unwrap();
        std::fs::write(chip_dir.join("spiroc2d.csv"), "a,2,,0,0\nb,2,,3,0\nc,1182,,4,0\n")
            .unwrap();
        let settings = Settings::from_vars(Some(dir.path().into()), None);
        assert!(matches!(
            settings.layout(ChipKind::Spiroc2d),
            Err(Error::Discontiguous { subadd: 3, offset: 2, .. })
        ));
    }

    #[test]
    fn test_missing_mapping() {
        let settings = Settings::from_vars(None, Some("/nonexistent/dif_mapping.txt".into()));
        assert!(settings.dif_mapping_file().is_none());
    }
}
