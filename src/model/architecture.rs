//! Known network architectures.

use std::fmt;
use std::str::FromStr;

/// Network architectures that parameter files are published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    /// Convolutional classifier over one-hot encoded sequences
    DeepNog,
    /// Classifier over learned amino-acid embeddings
    DeepEncoding,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Architecture::DeepNog, Architecture::DeepEncoding];

    pub fn name(&self) -> &'static str {
        match self {
            Architecture::DeepNog => "deepnog",
            Architecture::DeepEncoding => "deepencoding",
        }
    }
}

impl FromStr for Architecture {
    type Err = crate::DeepnogError;

    fn from_str(name: &str) -> crate::Result<Self> {
        let wanted = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|arch| arch.name() == wanted)
            .ok_or_else(|| crate::DeepnogError::UnsupportedArchitecture(name.to_string()))
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_detection() {
        assert_eq!("deepnog".parse::<Architecture>().unwrap(), Architecture::DeepNog);
        assert_eq!("DeepEncoding".parse::<Architecture>().unwrap(), Architecture::DeepEncoding);
        assert!(matches!(
            "transformer".parse::<Architecture>(),
            Err(crate::DeepnogError::UnsupportedArchitecture(_))
        ));
    }
}
