//! Variant option normalization and resolution.
//!
//! Backend option names are free-form ("Colour", "color ", "Shoe Size",
//! "Größe"), so everything routes through [`normalize_option_name`] before
//! comparison. The functions here are pure; the modal controller owns the
//! session state.

use std::collections::HashMap;

use crate::api::types::{Product, Variant};

/// Canonical identity of an option axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionKey {
    Color,
    Size,
    Other(String),
}

impl OptionKey {
    /// Display label for the group heading.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Color => "Color",
            Self::Size => "Size",
            Self::Other(name) => name,
        }
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Self::Color => 0,
            Self::Size => 1,
            Self::Other(_) => 2,
        }
    }
}

/// The customer's current choice per option axis.
pub type Selection = HashMap<OptionKey, String>;

/// One value within an option group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionValue {
    pub value: String,
    /// True when at least one variant carrying this value is purchasable.
    pub available: bool,
}

/// A deduplicated option axis across all variants of a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionGroup {
    pub key: OptionKey,
    pub values: Vec<OptionValue>,
}

/// Outcome of variant resolution.
#[derive(Debug, Clone)]
pub struct ResolvedVariant {
    pub variant: Variant,
    /// True when the product has no variants at all and a stand-in was
    /// fabricated; price display then falls back to the product price.
    pub synthetic: bool,
}

/// Fold a raw option name down to its canonical key.
///
/// Strips every non-letter character and casefolds before matching, so
/// "Colour ", "COLOR" and "color-2" all land on [`OptionKey::Color`]. The
/// color check runs before the size check, so a name matching both maps to
/// color. A name with no letters at all becomes `Other("option")`.
#[must_use]
pub fn normalize_option_name(name: &str) -> OptionKey {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase();

    if cleaned.is_empty() {
        OptionKey::Other("option".to_string())
    } else if cleaned.contains("colour") || cleaned.contains("color") {
        OptionKey::Color
    } else if cleaned.contains("size") {
        OptionKey::Size
    } else {
        OptionKey::Other(cleaned)
    }
}

/// Collect the distinct option axes across `variants`.
///
/// Values keep first-seen order within a group; a value is available when
/// any variant carrying it is. Groups come back ordered color, size, then
/// the rest in encountered order.
#[must_use]
pub fn build_option_groups(variants: &[Variant]) -> Vec<OptionGroup> {
    let mut groups: Vec<OptionGroup> = Vec::new();

    for variant in variants {
        let available = variant.is_available();
        for option in &variant.options {
            let key = normalize_option_name(&option.option_name);
            let value = option.value.trim();
            if value.is_empty() {
                continue;
            }

            let index = match groups.iter().position(|g| g.key == key) {
                Some(index) => index,
                None => {
                    groups.push(OptionGroup {
                        key: key.clone(),
                        values: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[index];

            if let Some(existing) = group.values.iter_mut().find(|v| v.value == value) {
                existing.available = existing.available || available;
            } else {
                group.values.push(OptionValue {
                    value: value.to_string(),
                    available,
                });
            }
        }
    }

    // Stable sort keeps encountered order inside each rank.
    groups.sort_by_key(|g| g.key.sort_rank());
    groups
}

/// Initial selection: first value of the first group, then the first
/// available value of every later group (first value when none is
/// available).
#[must_use]
pub fn default_selection(groups: &[OptionGroup]) -> Selection {
    let mut selection = Selection::new();
    for (index, group) in groups.iter().enumerate() {
        let value = if index == 0 {
            group.values.first()
        } else {
            group
                .values
                .iter()
                .find(|v| v.available)
                .or_else(|| group.values.first())
        };
        if let Some(value) = value {
            selection.insert(group.key.clone(), value.value.clone());
        }
    }
    selection
}

/// Pick the variant matching `selection`.
///
/// A variant matches when it carries every selected (axis, value) pair;
/// extra axes on the variant are fine. Falls back to the first variant,
/// and for variant-less products fabricates an always-available stand-in.
#[must_use]
pub fn resolve_variant(product: &Product, selection: &Selection) -> ResolvedVariant {
    let matched = product.variants.iter().find(|variant| {
        selection.iter().all(|(key, value)| {
            variant.options.iter().any(|option| {
                normalize_option_name(&option.option_name) == *key
                    && option.value.trim() == value.trim()
            })
        })
    });

    if let Some(variant) = matched.or_else(|| product.variants.first()) {
        return ResolvedVariant {
            variant: variant.clone(),
            synthetic: false,
        };
    }

    ResolvedVariant {
        variant: Variant {
            product_id: Some(product.id.clone()),
            ..Variant::default()
        },
        synthetic: true,
    }
}
