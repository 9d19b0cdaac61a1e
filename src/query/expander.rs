/// Static synonym table used for query expansion, in substitution order.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "lpu",
        &["lovely professional university", "lpu university", "lovely university"],
    ),
    ("fee", &["fees", "tuition", "cost", "payment"]),
    ("admission", &["admissions", "enrollment", "joining", "application"]),
    ("course", &["program", "degree", "curriculum", "study"]),
];

/// Maximum number of variants (including the original query) sent to the
/// knowledge base per request; bounds retrieval cost.
pub const MAX_VARIANTS: usize = 3;

/// Generates synonym-substituted variants of a normalized query. The first
/// element is always the input; each variant substitutes exactly one token.
pub fn expand_query(normalized: &str) -> Vec<String> {
    let terms: Vec<&str> = normalized.split_whitespace().collect();
    let mut expanded = vec![normalized.to_string()];

    for (i, term) in terms.iter().enumerate() {
        if let Some((_, synonyms)) = SYNONYMS.iter().find(|(key, _)| key == term) {
            for synonym in *synonyms {
                let mut variant = terms.clone();
                variant[i] = synonym;
                expanded.push(variant.join(" "));
            }
        }
    }

    expanded.truncate(MAX_VARIANTS);
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_variant_is_the_input() {
        let variants = expand_query("lpu admission process");
        assert_eq!(variants[0], "lpu admission process");
    }

    #[test]
    fn expansion_is_bounded() {
        for query in [
            "lpu fee admission course",
            "fee",
            "nothing matches here",
            "",
        ] {
            assert!(expand_query(query).len() <= MAX_VARIANTS);
        }
    }

    #[test]
    fn substitutes_one_token_per_variant_in_table_order() {
        let variants = expand_query("lpu fee");
        assert_eq!(
            variants,
            vec![
                "lpu fee".to_string(),
                "lovely professional university fee".to_string(),
                "lpu university fee".to_string(),
            ]
        );
    }

    #[test]
    fn no_synonyms_yields_only_the_input() {
        assert_eq!(expand_query("hostel rules"), vec!["hostel rules".to_string()]);
    }
}
