// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dotted-path helpers.
//!
//! Paths are plain strings (`"resources.wire"`). Empty segments are kept
//! as-is; an empty path addresses nothing and resolves to absent, it is
//! never an error.

/// Splits a dotted path into its segments.
#[inline]
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.')
}

/// Splits a dotted path into `(parent segments, leaf)`.
///
/// Returns `None` for the empty path.
pub fn parent_and_leaf(path: &str) -> Option<(Vec<&str>, &str)> {
    if path.is_empty() {
        return None;
    }
    let mut segments: Vec<&str> = split_path(path).collect();
    let leaf = segments.pop()?;
    Some((segments, leaf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_single_segment() {
        let segments: Vec<&str> = split_path("resources").collect();
        assert_eq!(segments, vec!["resources"]);
    }

    #[test]
    fn split_nested_path() {
        let segments: Vec<&str> = split_path("market.demand.boost").collect();
        assert_eq!(segments, vec!["market", "demand", "boost"]);
    }

    #[test]
    fn parent_and_leaf_of_two_segments() {
        let (parents, leaf) = parent_and_leaf("resources.wire").unwrap();
        assert_eq!(parents, vec!["resources"]);
        assert_eq!(leaf, "wire");
    }

    #[test]
    fn parent_and_leaf_of_top_level_key() {
        let (parents, leaf) = parent_and_leaf("flags").unwrap();
        assert!(parents.is_empty());
        assert_eq!(leaf, "flags");
    }

    #[test]
    fn empty_path_has_no_leaf() {
        assert!(parent_and_leaf("").is_none());
    }
}
