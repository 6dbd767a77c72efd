use crate::common::error::{ArchiveNameParse, RegexCompile, Result};
use regex::Regex;
use snafu::{OptionExt, ResultExt};

/// A deployable network archive, with name and version parsed from its
/// `<name>_<version>.bna` filename. The first underscore splits the name from the version.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct NetworkArchive {
    file_name: String,
    name: String,
    version: String,
}

impl NetworkArchive {
    /// Parse an archive filename. A filename without an underscore or without the `.bna`
    /// suffix is a hard error, not silently ignored.
    pub(crate) fn parse(file_name: &str) -> Result<Self> {
        let expression = r"^([^_]+)_(.+)\.bna$";
        let regex = Regex::new(expression).context(RegexCompile {
            expression: expression.to_string(),
        })?;

        let captures = regex.captures(file_name).context(ArchiveNameParse {
            filename: file_name.to_string(),
        })?;

        Ok(Self {
            file_name: file_name.to_string(),
            name: captures[1].to_string(),
            version: captures[2].to_string(),
        })
    }

    /// This is a getter function for the archive filename.
    pub(crate) fn file_name(&self) -> &str {
        self.file_name.as_str()
    }

    /// This is a getter function for the network name.
    pub(crate) fn name(&self) -> &str {
        self.name.as_str()
    }

    /// This is a getter function for the network version.
    pub(crate) fn version(&self) -> &str {
        self.version.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::NetworkArchive;
    use crate::common::error::Error;

    #[test]
    fn parses_name_and_version() {
        let archive = NetworkArchive::parse("mynet_1.2.3.bna").expect("filename is well-formed");
        assert_eq!(archive.name(), "mynet");
        assert_eq!(archive.version(), "1.2.3");
        assert_eq!(archive.file_name(), "mynet_1.2.3.bna");
    }

    #[test]
    fn filename_without_underscore_is_an_error() {
        let error = NetworkArchive::parse("bad-format.bna").expect_err("no underscore");
        assert!(matches!(error, Error::ArchiveNameParse { filename } if filename == "bad-format.bna"));
    }

    #[test]
    fn splits_at_the_first_underscore() {
        let archive = NetworkArchive::parse("my_net_1.2.3.bna").expect("filename is well-formed");
        assert_eq!(archive.name(), "my");
        assert_eq!(archive.version(), "net_1.2.3");
    }

    #[test]
    fn filename_without_bna_suffix_is_an_error() {
        assert!(NetworkArchive::parse("mynet_1.2.3.tar").is_err());
    }
}
