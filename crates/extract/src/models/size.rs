use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// Creature size category, normalized across game systems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}
impl Size {
    pub fn as_str(&self) -> &'static str {
        match self {
            Size::Tiny => "tiny",
            Size::Small => "small",
            Size::Medium => "medium",
            Size::Large => "large",
            Size::Huge => "huge",
            Size::Gargantuan => "gargantuan",
        }
    }
}
impl FromStr for Size {
    type Err = Error;
    /// Accepts full names, the short codes used by the d20 systems
    /// (`sm`, `med`, `lg`, `grg`) and DSA5's size words.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "tiny" | "tin" | "winzig" => Self::Tiny,
            "small" | "sm" | "klein" => Self::Small,
            "medium" | "med" | "average" | "mittel" => Self::Medium,
            "large" | "lg" | "big" | "gross" | "groß" => Self::Large,
            "huge" | "giant" | "riesig" => Self::Huge,
            "gargantuan" | "grg" | "colossal" | "gigantic" => Self::Gargantuan,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "size",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for Size {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tiny", Size::Tiny)]
    #[case("sm", Size::Small)]
    #[case("Med", Size::Medium)]
    #[case(" average ", Size::Medium)]
    #[case("lg", Size::Large)]
    #[case("big", Size::Large)]
    #[case("HUGE", Size::Huge)]
    #[case("grg", Size::Gargantuan)]
    fn test_parse(#[case] input: &str, #[case] expected: Size) {
        assert_eq!(input.parse::<Size>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_size_is_an_error() {
        let err = "planetary".parse::<Size>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "size", .. }));
    }

    #[test]
    fn test_ordering_follows_size() {
        assert!(Size::Tiny < Size::Medium);
        assert!(Size::Huge < Size::Gargantuan);
    }
}
