// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod limits;

use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of the given parts, each terminated by a NUL byte.
pub fn stable_hash<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_boundaries_matter() {
        assert_ne!(stable_hash(["ab", "c"]), stable_hash(["a", "bc"]));
        assert_eq!(stable_hash(["x"]).len(), 64);
    }
}
