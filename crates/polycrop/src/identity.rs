//! Cache identity for the transformation.
//!
//! Persistent caches need two things from a transformation: a stable
//! version token that invalidates every stored result when the algorithm
//! changes, and a per-call key that separates results produced with
//! different parameters. Both are pure functions of the parameter triple;
//! the source image is keyed by the caller.

use std::hash::Hasher;

use siphasher::sip::SipHasher13;

use crate::types::CropParams;

/// Algorithm version. Bump on any change that alters output pixels, so
/// persisted results from older versions are discarded.
pub const VERSION: u32 = 1;

/// Stable identity token; embeds [`VERSION`].
pub const IDENTITY: &str = "polycrop.polygon-crop.v1";

/// Deterministic cache key for a parameter triple.
///
/// Equal triples produce equal keys; any differing field produces a
/// different key. The key embeds [`IDENTITY`], so it also changes across
/// algorithm versions.
#[must_use]
pub fn cache_key(params: &CropParams) -> String {
    format!(
        "{IDENTITY}?sides={}&rotation={}&corner_radius={}",
        params.sides, params.rotation, params.corner_radius
    )
}

/// Compact 64-bit digest of [`cache_key`]'s content, for caches keyed on
/// fixed-width hashes. Deterministic across processes and platforms.
#[must_use]
pub fn cache_digest(params: &CropParams) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(IDENTITY.as_bytes());
    hasher.write_u32(params.sides);
    hasher.write_i32(params.rotation);
    hasher.write_u32(params.corner_radius);
    hasher.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_embeds_the_version() {
        assert_eq!(IDENTITY, format!("polycrop.polygon-crop.v{VERSION}"));
    }

    #[test]
    fn equal_params_share_a_key() {
        let a = CropParams {
            sides: 5,
            rotation: 30,
            corner_radius: 8,
        };
        let b = a;
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_eq!(cache_digest(&a), cache_digest(&b));
    }

    #[test]
    fn each_field_separates_keys() {
        let base = CropParams {
            sides: 5,
            rotation: 30,
            corner_radius: 8,
        };
        let variants = [
            CropParams { sides: 6, ..base },
            CropParams {
                rotation: 31,
                ..base
            },
            CropParams {
                corner_radius: 9,
                ..base
            },
        ];
        for other in variants {
            assert_ne!(cache_key(&base), cache_key(&other), "{other:?}");
            assert_ne!(cache_digest(&base), cache_digest(&other), "{other:?}");
        }
    }

    #[test]
    fn negative_rotation_is_distinct() {
        let pos = CropParams {
            sides: 4,
            rotation: 45,
            corner_radius: 0,
        };
        let neg = CropParams {
            rotation: -45,
            ..pos
        };
        assert_ne!(cache_key(&pos), cache_key(&neg));
    }

    #[test]
    fn key_is_stable_across_calls() {
        let params = CropParams::default();
        assert_eq!(cache_key(&params), cache_key(&params));
        assert_eq!(cache_digest(&params), cache_digest(&params));
    }

    #[test]
    fn key_spells_out_the_triple() {
        let params = CropParams {
            sides: 4,
            rotation: -90,
            corner_radius: 16,
        };
        assert_eq!(
            cache_key(&params),
            "polycrop.polygon-crop.v1?sides=4&rotation=-90&corner_radius=16",
        );
    }
}
