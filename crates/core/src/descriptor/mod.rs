use serde::{Deserialize, Serialize};

use crate::{Result, SessionError};

/// Upper bound on the number of elements a single profile may describe.
pub const MAX_ELEMENTS: usize = 100;

/// One processing element: the factory to instantiate and the properties to
/// apply to it, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub factory: String,
    pub properties: Vec<(String, String)>,
}

/// Ordered chain of elements; element `i` feeds element `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    elements: Vec<ElementSpec>,
}

impl PipelineDescriptor {
    /// Element specs in link order.
    pub fn elements(&self) -> &[ElementSpec] {
        &self.elements
    }

    /// Number of elements the pipeline will contain.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always `false` for descriptors returned by [`build`].
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl IntoIterator for PipelineDescriptor {
    type Item = ElementSpec;
    type IntoIter = std::vec::IntoIter<ElementSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Builds a descriptor using the default [`MAX_ELEMENTS`] limit.
pub fn build(tokens: Vec<String>) -> Result<PipelineDescriptor> {
    build_with_limit(tokens, MAX_ELEMENTS)
}

/// Walks the token sequence record by record.
///
/// A record is `factory`, `count`, then `count` key/value pairs. Records are
/// consumed from the front until the tokens run out, so the element count is
/// only known once the walk finishes.
pub fn build_with_limit(tokens: Vec<String>, limit: usize) -> Result<PipelineDescriptor> {
    if tokens.is_empty() {
        return Err(SessionError::parse("profile contains no tokens"));
    }

    let mut tokens = tokens.into_iter();
    let mut elements = Vec::new();

    while let Some(factory) = tokens.next() {
        if elements.len() == limit {
            return Err(SessionError::TooManyElements { limit });
        }
        if factory.is_empty() {
            return Err(SessionError::parse(format!(
                "element {} has an empty factory name",
                elements.len()
            )));
        }

        let count = tokens.next().ok_or_else(|| {
            SessionError::parse(format!("element `{factory}` is missing its property count"))
        })?;
        let declared = parse_count(&factory, &count)?;

        let available = tokens.len();
        if declared
            .checked_mul(2)
            .map_or(true, |needed| needed > available)
        {
            return Err(SessionError::PropertyCountMismatch {
                factory,
                declared,
                available,
            });
        }

        let mut properties = Vec::with_capacity(declared);
        for _ in 0..declared {
            let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
                return Err(SessionError::PropertyCountMismatch {
                    factory,
                    declared,
                    available,
                });
            };
            properties.push((key, value));
        }

        elements.push(ElementSpec {
            factory,
            properties,
        });
    }

    Ok(PipelineDescriptor { elements })
}

/// Counts are plain decimal digits; `usize::from_str` alone would also take a
/// leading `+`.
fn parse_count(factory: &str, count: &str) -> Result<usize> {
    let invalid =
        || SessionError::parse(format!("element `{factory}` has invalid property count `{count}`"));
    if count.is_empty() || !count.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    count.parse().map_err(|_| invalid())
}
