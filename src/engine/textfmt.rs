//! Text example format.
//!
//! One example per line:
//!
//! ```text
//! [label] [importance] [tag] |namespace[:scale] feature[:value] ... |other ...
//! ```
//!
//! Everything before the first `|` is the label block: a leading numeric
//! token is the label, a second numeric token the importance weight, and a
//! non-numeric token the example tag. Each `|` opens a namespace; features
//! inside it hash under the namespace id and land in the model's weight
//! table masked to its bit width. Malformed numeric fields in the feature
//! blocks are reported as engine errors.

use super::hash::uniform_hash;
use super::{EngineError, EngineResult};

/// Parsed representation of one example line.
#[derive(Debug, Clone, Default)]
pub struct ParsedExample {
    pub label: Option<f32>,
    pub weight: f32,
    pub tag: Option<String>,
    /// Masked weight-table indices paired with feature values.
    pub features: Vec<(u32, f32)>,
}

/// Parse one line into a [`ParsedExample`], masking feature indices with
/// `mask` (the model's weight-table size minus one).
pub fn parse_line(line: &str, mask: u32) -> EngineResult<ParsedExample> {
    let mut example = ParsedExample {
        weight: 1.0,
        ..ParsedExample::default()
    };

    let mut segments = line.split('|');

    // label block is lenient: stray non-numeric tokens become the tag
    if let Some(head) = segments.next() {
        for token in head.split_whitespace() {
            if example.label.is_none() {
                if let Ok(value) = token.parse::<f32>() {
                    example.label = Some(value);
                    continue;
                }
            } else if let Ok(value) = token.parse::<f32>() {
                example.weight = value;
                continue;
            }
            example.tag = Some(token.to_string());
        }
    }

    for segment in segments {
        let mut tokens = segment.split_whitespace();

        let (namespace, scale) = match tokens.next() {
            Some(spec) => parse_namespace(spec)?,
            None => (String::new(), 1.0),
        };
        let namespace_id = uniform_hash(namespace.as_bytes(), 0);

        for token in tokens {
            let (name, value) = parse_feature(token)?;
            let index = uniform_hash(name.as_bytes(), namespace_id) & mask;
            example.features.push((index, value * scale));
        }
    }

    Ok(example)
}

fn parse_namespace(spec: &str) -> EngineResult<(String, f32)> {
    match spec.split_once(':') {
        Some((name, scale)) => {
            let scale = scale.parse::<f32>().map_err(|_| {
                EngineError::new(format!("malformed namespace scale in '{}'", spec))
            })?;
            Ok((name.to_string(), scale))
        }
        None => Ok((spec.to_string(), 1.0)),
    }
}

fn parse_feature(token: &str) -> EngineResult<(&str, f32)> {
    match token.split_once(':') {
        Some((name, value)) => {
            let value = value
                .parse::<f32>()
                .map_err(|_| EngineError::new(format!("malformed feature value in '{}'", token)))?;
            Ok((name, value))
        }
        None => Ok((token, 1.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASK: u32 = (1 << 18) - 1;

    #[test]
    fn labeled_example() {
        let example = parse_line("1 |f a b", MASK).unwrap();
        assert_eq!(example.label, Some(1.0));
        assert_eq!(example.weight, 1.0);
        assert_eq!(example.features.len(), 2);
    }

    #[test]
    fn unlabeled_example() {
        let example = parse_line("|f a", MASK).unwrap();
        assert_eq!(example.label, None);
        assert_eq!(example.features.len(), 1);
    }

    #[test]
    fn importance_weight_and_tag() {
        let example = parse_line("-1 0.5 first|f a", MASK).unwrap();
        assert_eq!(example.label, Some(-1.0));
        assert_eq!(example.weight, 0.5);
        assert_eq!(example.tag.as_deref(), Some("first"));
    }

    #[test]
    fn valued_features_and_namespace_scale() {
        let example = parse_line("1 |f:2 a:0.5 b", MASK).unwrap();
        assert_eq!(example.features[0].1, 1.0);
        assert_eq!(example.features[1].1, 2.0);
    }

    #[test]
    fn same_feature_same_index() {
        let first = parse_line("1 |f a", MASK).unwrap();
        let second = parse_line("0 |f a", MASK).unwrap();
        assert_eq!(first.features[0].0, second.features[0].0);
    }

    #[test]
    fn namespaces_separate_features() {
        let example = parse_line("1 |f a |g a", MASK).unwrap();
        assert_ne!(example.features[0].0, example.features[1].0);
    }

    #[test]
    fn indices_respect_mask() {
        let mask = (1 << 4) - 1;
        let example = parse_line("1 |f alpha beta gamma delta", mask).unwrap();
        assert!(example.features.iter().all(|(index, _)| *index <= mask));
    }

    #[test]
    fn malformed_feature_value() {
        let err = parse_line("1 |f a:xyz", MASK).unwrap_err();
        assert!(err.message().contains("a:xyz"));
    }

    #[test]
    fn malformed_namespace_scale() {
        assert!(parse_line("1 |f:bad a", MASK).is_err());
    }
}
