use bstr::{BStr, BString, ByteSlice};

/// A validated, complete reference name such as `refs/heads/main` or `HEAD`.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FullName(pub(crate) BString);

impl FullName {
    /// Validate `name` as a complete reference name, accepting the all-uppercase
    /// standalone form (`HEAD`) as well as slashed paths (`refs/heads/main`).
    pub fn try_from(name: impl Into<BString>) -> Result<Self, git_validate::reference::name::Error> {
        let name = name.into();
        git_validate::reference::name(name.as_bstr())?;
        Ok(FullName(name))
    }

    pub fn as_bstr(&self) -> &BStr {
        self.0.as_bstr()
    }

    /// The final path component, e.g. `main` for `refs/heads/main`.
    pub fn shorten(&self) -> &BStr {
        self.0.rsplitn(2, |&b| b == b'/').next().unwrap_or(&self.0).as_bstr()
    }

    /// The relative filesystem path of this ref under a `.git` directory.
    pub fn to_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(self.0.to_string())
    }
}

impl std::fmt::Display for FullName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_bstr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_head_and_refs_heads() {
        assert!(FullName::try_from("HEAD").is_ok());
        assert!(FullName::try_from("refs/heads/main").is_ok());
    }

    #[test]
    fn rejects_lowercase_standalone_names() {
        assert!(FullName::try_from("head").is_err());
    }

    #[test]
    fn shorten_returns_the_final_component() {
        let name = FullName::try_from("refs/heads/feature/x").unwrap();
        assert_eq!(name.shorten(), "x");
    }
}
