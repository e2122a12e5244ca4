use tracing::debug;

use super::SegmentError;

/// Characters that survive digit stripping, paired with their byte offset in
/// the source text. Whitespace left behind by a removed number collapses into
/// the preceding separator, and leading whitespace is dropped.
fn retained_chars(text: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut previous_space = true;
    text.char_indices().filter(move |(_, character)| {
        if character.is_ascii_digit() {
            return false;
        }
        if character.is_whitespace() {
            if previous_space {
                return false;
            }
            previous_space = true;
            return true;
        }
        previous_space = false;
        true
    })
}

pub fn strip_digits(text: &str) -> String {
    retained_chars(text).map(|(_, character)| character).collect()
}

/// Finds the running header shared by at least `threshold` of the pages.
///
/// Candidates are drawn from the first page and, separately, from the last
/// page so that an atypical title page cannot hide the header. The longer
/// candidate wins. An empty string means nothing met the threshold.
pub fn find_common_prefix(pages: &[String], threshold: f64) -> Result<String, SegmentError> {
    if pages.is_empty() {
        return Err(SegmentError::EmptyDocument);
    }

    let stripped = pages
        .iter()
        .map(|page| strip_digits(page))
        .collect::<Vec<String>>();

    let forward = longest_accepted_prefix(&stripped[0], &stripped, threshold);
    let backward = longest_accepted_prefix(&stripped[stripped.len() - 1], &stripped, threshold);
    debug!(
        forward_len = forward.chars().count(),
        backward_len = backward.chars().count(),
        "common prefix candidates"
    );

    let prefix = if forward.chars().count() > backward.chars().count() {
        forward
    } else {
        backward
    };

    Ok(prefix.to_string())
}

fn longest_accepted_prefix<'a>(source: &'a str, pages: &[String], threshold: f64) -> &'a str {
    let total = pages.len() as f64;

    // Page coverage only shrinks as the prefix grows, so the longest accepted
    // length is one of the per-page shared lengths.
    let mut shared_lengths = pages
        .iter()
        .map(|page| shared_prefix_chars(source, page))
        .collect::<Vec<usize>>();
    shared_lengths.sort_unstable_by(|a, b| b.cmp(a));

    for (index, &length) in shared_lengths.iter().enumerate() {
        if length == 0 {
            break;
        }
        let covering = index
            + shared_lengths[index..]
                .iter()
                .take_while(|&&other| other == length)
                .count();
        if covering as f64 / total >= threshold {
            return prefix_of_chars(source, length);
        }
    }

    ""
}

fn shared_prefix_chars(left: &str, right: &str) -> usize {
    left.chars()
        .zip(right.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

fn prefix_of_chars(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}

/// Strips the detected prefix from every page whose digit-stripped text starts
/// with it. Digits and collapsed whitespace directly after the prefix go with
/// it; pages that do not carry the prefix are returned unchanged.
pub fn remove_prefix(pages: &[String], prefix: &str) -> Vec<String> {
    if prefix.is_empty() {
        return pages.to_vec();
    }

    let prefix_len = prefix.chars().count();
    pages
        .iter()
        .map(|page| {
            if !strip_digits(page).starts_with(prefix) {
                return page.clone();
            }

            let mut retained = retained_chars(page).skip(prefix_len);
            match retained.next() {
                Some((offset, _)) => page[offset..].to_string(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|page| page.to_string()).collect()
    }

    #[test]
    fn strip_digits_collapses_gaps_left_by_numbers() {
        assert_eq!(
            strip_digits("journal of science 12 introduction"),
            "journal of science introduction"
        );
        assert_eq!(strip_digits("7 journal 2024"), "journal ");
        assert_eq!(strip_digits("covid19 cases"), "covid cases");
    }

    #[test]
    fn detects_running_header_on_every_page() {
        let pages = pages(&[
            "journal of science 1 introduction to field work",
            "journal of science 2 methods were applied",
            "journal of science 3 results show growth",
            "journal of science 4 conclusion and outlook",
        ]);

        let prefix = find_common_prefix(&pages, 1.0).expect("prefix");
        assert_eq!(prefix, "journal of science ");

        let lower = find_common_prefix(&pages, 0.6).expect("prefix");
        assert_eq!(lower, "journal of science ");
    }

    #[test]
    fn reversed_scan_recovers_header_when_first_page_is_a_title_page() {
        let pages = pages(&[
            "annual proceedings volume 3",
            "proc annual meeting 10 keynote address",
            "proc annual meeting 11 panel discussion",
            "proc annual meeting 12 workshop summary",
        ]);

        let prefix = find_common_prefix(&pages, 0.7).expect("prefix");
        assert_eq!(prefix, "proc annual meeting ");
    }

    #[test]
    fn returns_empty_prefix_when_threshold_is_not_met() {
        let pages = pages(&["alpha one", "beta two", "gamma three"]);
        assert_eq!(find_common_prefix(&pages, 0.6).expect("prefix"), "");
    }

    #[test]
    fn empty_page_list_is_an_error() {
        assert_eq!(
            find_common_prefix(&[], 0.6),
            Err(SegmentError::EmptyDocument)
        );
    }

    #[test]
    fn prefix_never_exceeds_shortest_covering_page() {
        let pages = pages(&["header a", "header", "header b"]);
        let prefix = find_common_prefix(&pages, 1.0).expect("prefix");
        assert_eq!(prefix, "header");
    }

    #[test]
    fn remove_prefix_drops_header_and_page_number() {
        let pages = pages(&[
            "journal of science 12 introduction to field work",
            "journal of science 13 methods were applied",
            "editorial board",
        ]);

        let stripped = remove_prefix(&pages, "journal of science ");
        assert_eq!(
            stripped,
            vec![
                "introduction to field work".to_string(),
                "methods were applied".to_string(),
                "editorial board".to_string(),
            ]
        );
    }

    #[test]
    fn remove_prefix_handles_numbers_inside_the_header() {
        let pages = pages(&["vol 12 no 3 journal 45 methods"]);
        let prefix = strip_digits("vol 12 no 3 journal ");
        assert_eq!(prefix, "vol no journal ");

        let stripped = remove_prefix(&pages, &prefix);
        assert_eq!(stripped, vec!["methods".to_string()]);
    }

    #[test]
    fn remove_prefix_with_empty_prefix_is_identity() {
        let pages = pages(&["one", "two"]);
        assert_eq!(remove_prefix(&pages, ""), pages);
    }

    #[test]
    fn remove_prefix_consuming_whole_page_leaves_empty_text() {
        let pages = pages(&["journal of science 14"]);
        assert_eq!(remove_prefix(&pages, "journal of science "), vec![String::new()]);
    }
}
