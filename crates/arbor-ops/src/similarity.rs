//! Closest-string matching for selection correction
//!
//! Case-insensitive Jaro-Winkler; ties keep the earliest candidate.

/// The candidate most similar to `input`, or `None` when there are no
/// candidates
#[must_use]
pub fn closest<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = input.to_lowercase();
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = strsim::jaro_winkler(&needle, &candidate.to_lowercase());
        match best {
            Some((_, top)) if top >= score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrects_typos_to_nearest_choice() {
        let choices = ["red", "green", "blue"];
        assert_eq!(closest("gren", choices), Some("green"));
        assert_eq!(closest("blu", choices), Some("blue"));
        assert_eq!(closest("red", choices), Some("red"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let choices = ["Alpha", "Beta"];
        assert_eq!(closest("ALPHA", choices), Some("Alpha"));
        assert_eq!(closest("beta", choices), Some("Beta"));
    }

    #[test]
    fn ties_keep_the_first_candidate() {
        let choices = ["aaab", "aaac"];
        assert_eq!(closest("aaa", choices), Some("aaab"));
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert_eq!(closest("anything", []), None);
    }
}
