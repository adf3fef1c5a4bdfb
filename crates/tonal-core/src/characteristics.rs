//! Structured tone characteristics.
//!
//! Each dimension accepts a closed set of values. Parsing is
//! case-insensitive and rejects anything outside the set rather than
//! coercing it to a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! closed_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $name::ALL.iter().map(|v| v.as_str()).collect();
                        format!("{} must be one of: {} (got {:?})", $label, allowed.join(", "), s)
                    })
            }
        }
    };
}

closed_vocabulary! {
    /// Overall emotional tone.
    Tone, "tone" {
        Formal => "formal",
        Casual => "casual",
        Friendly => "friendly",
        Professional => "professional",
        Authoritative => "authoritative",
        Warm => "warm",
        Direct => "direct",
    }
}

closed_vocabulary! {
    LanguageStyle, "language_style" {
        Technical => "technical",
        Conversational => "conversational",
        Academic => "academic",
        Professional => "professional",
        Creative => "creative",
    }
}

closed_vocabulary! {
    FormalityLevel, "formality_level" {
        Formal => "formal",
        SemiFormal => "semi-formal",
        Informal => "informal",
    }
}

closed_vocabulary! {
    /// Forms of address.
    AddressStyle, "address_style" {
        Direct => "direct",
        Indirect => "indirect",
        Personal => "personal",
        Impersonal => "impersonal",
        Collective => "collective",
    }
}

closed_vocabulary! {
    EmotionalAppeal, "emotional_appeal" {
        Rational => "rational",
        Emotional => "emotional",
        Inspirational => "inspirational",
        Humorous => "humorous",
        Authoritative => "authoritative",
    }
}

/// The five dimensions of a tone profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneCharacteristics {
    pub tone: Tone,
    pub language_style: LanguageStyle,
    pub formality_level: FormalityLevel,
    pub address_style: AddressStyle,
    pub emotional_appeal: EmotionalAppeal,
}

impl ToneCharacteristics {
    /// Canonical signature text for this profile.
    ///
    /// Identical characteristics always render to identical text, so
    /// signatures built from them are stable cache inputs.
    pub fn render(&self) -> String {
        format!(
            "tone: {}\nlanguage_style: {}\nformality_level: {}\naddress_style: {}\nemotional_appeal: {}",
            self.tone,
            self.language_style,
            self.formality_level,
            self.address_style,
            self.emotional_appeal
        )
    }

    /// Parse text produced by [`ToneCharacteristics::render`].
    pub fn parse_rendered(text: &str) -> Result<Self, String> {
        let mut tone = None;
        let mut language_style = None;
        let mut formality_level = None;
        let mut address_style = None;
        let mut emotional_appeal = None;

        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| format!("malformed signature line: {:?}", line))?;
            match key.trim() {
                "tone" => tone = Some(value.parse()?),
                "language_style" => language_style = Some(value.parse()?),
                "formality_level" => formality_level = Some(value.parse()?),
                "address_style" => address_style = Some(value.parse()?),
                "emotional_appeal" => emotional_appeal = Some(value.parse()?),
                other => return Err(format!("unknown signature field: {}", other)),
            }
        }

        Ok(Self {
            tone: tone.ok_or("missing field: tone")?,
            language_style: language_style.ok_or("missing field: language_style")?,
            formality_level: formality_level.ok_or("missing field: formality_level")?,
            address_style: address_style.ok_or("missing field: address_style")?,
            emotional_appeal: emotional_appeal.ok_or("missing field: emotional_appeal")?,
        })
    }
}
