//! Collection naming.
//!
//! Each embedding model gets its own vector collection. The collection name
//! is derived from the model identity reported by the embedding service,
//! which is usually a file path such as `models/nomic_embed.Q8.gguf`.

use crate::models::Namespace;

/// Characters that are not allowed in collection names.
const REPLACED: [char; 5] = ['_', '.', '%', '|', '$'];

/// Derive the collection name for a model identity.
///
/// Takes the last `/`-separated segment, strips its extension (from the
/// final `.`), and replaces every `_ . % | $` with `-`. Total and
/// idempotent: the output never contains a replaced character or a `/`.
///
/// # Example
///
/// ```rust
/// use gorag::collection::collection_name_for;
///
/// assert_eq!(collection_name_for("models/nomic_embed.gguf").as_str(), "nomic-embed");
/// assert_eq!(collection_name_for("bge_small").as_str(), "bge-small");
/// assert_eq!(collection_name_for("").as_str(), "");
/// ```
pub fn collection_name_for(model: &str) -> Namespace {
    let trimmed = model.trim_end_matches('/');
    let base = trimmed.rsplit('/').next().unwrap_or(trimmed);
    let stem = match base.rfind('.') {
        Some(pos) => &base[..pos],
        None => base,
    };

    let name = stem
        .chars()
        .map(|c| if REPLACED.contains(&c) { '-' } else { c })
        .collect();

    Namespace::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_extension() {
        assert_eq!(
            collection_name_for("/opt/models/all_MiniLM_L6.gguf").as_str(),
            "all-MiniLM-L6"
        );
    }

    #[test]
    fn test_multi_dot_keeps_inner_segments() {
        assert_eq!(
            collection_name_for("models/foo_bar.Q4.gguf").as_str(),
            "foo-bar-Q4"
        );
    }

    #[test]
    fn test_no_separator_uses_whole_string() {
        assert_eq!(collection_name_for("nomic%embed|v1").as_str(), "nomic-embed-v1");
        assert_eq!(collection_name_for("cost$model").as_str(), "cost-model");
    }

    #[test]
    fn test_trailing_slash_ignored() {
        assert_eq!(collection_name_for("models/bge_base/").as_str(), "bge-base");
    }

    #[test]
    fn test_empty() {
        assert!(collection_name_for("").is_empty());
    }

    #[test]
    fn test_output_has_no_reserved_characters() {
        let inputs = [
            "models/foo_bar.Q4.gguf",
            "a/b/c%d|e_f.bin",
            "x/y/z.w.v.u",
            "hf/org/model_v1.5.safetensors",
            "dir/under__score%%pipe||.onnx",
        ];
        for input in inputs {
            let name = collection_name_for(input);
            for c in ['_', '.', '%', '|', '$', '/'] {
                assert!(
                    !name.as_str().contains(c),
                    "{:?} -> {:?} contains {:?}",
                    input,
                    name,
                    c
                );
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "models/foo_bar.Q4.gguf",
            "plain",
            "",
            "a/b/c%d|e_f.bin",
            "weird$.name.",
            "-already-clean-",
        ];
        for input in inputs {
            let once = collection_name_for(input);
            let twice = collection_name_for(once.as_str());
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }
}
