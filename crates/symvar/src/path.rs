//! Parsing of variable paths typed on the command line
//!
//! A path names a global, optionally followed by one member or one index:
//! `v5`, `sv1.s1v3`, `av7[2]`.

use std::fmt;
use std::str::FromStr;

/// What follows the global's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector
{
    Member(String),
    Index(u64),
}

/// A global plus an optional member or element selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePath
{
    pub global: String,
    pub selector: Option<Selector>,
}

impl FromStr for VariablePath
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let s = s.trim();
        let invalid = || format!("Invalid variable path: {s}. Use name, name.member or name[index]");

        if let Some(open) = s.find('[') {
            let index = s[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
            let index = index.trim().parse::<u64>().map_err(|_| invalid())?;
            return Ok(Self {
                global: identifier(&s[..open]).ok_or_else(invalid)?,
                selector: Some(Selector::Index(index)),
            });
        }

        match s.split_once('.') {
            Some((global, member)) => Ok(Self {
                global: identifier(global).ok_or_else(invalid)?,
                selector: Some(Selector::Member(identifier(member).ok_or_else(invalid)?)),
            }),
            None => Ok(Self {
                global: identifier(s).ok_or_else(invalid)?,
                selector: None,
            }),
        }
    }
}

impl fmt::Display for VariablePath
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.selector {
            None => write!(f, "{}", self.global),
            Some(Selector::Member(member)) => write!(f, "{}.{member}", self.global),
            Some(Selector::Index(index)) => write!(f, "{}[{index}]", self.global),
        }
    }
}

fn identifier(s: &str) -> Option<String>
{
    let mut chars = s.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_alphabetic() || first == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then(|| s.to_string())
}
