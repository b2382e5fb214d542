//! Multiple-choice option generation.

use hanzi_core::matching::normalize;
use hanzi_core::model::PracticeItem;
use rand::Rng;
use rand::seq::SliceRandom;

/// Wrong options offered next to the correct answer.
pub const DEFAULT_DISTRACTORS: usize = 3;

/// Build the option list for the item at `exclude_index`.
///
/// Candidates are the answers of every other pool item, minus any that equal
/// the correct answer after normalization. They are shuffled, `count` are
/// kept, the correct answer is added, and the result is shuffled again. A
/// small pool yields fewer options. Different items sharing the same answer
/// text may both appear.
pub fn sample<R: Rng + ?Sized>(
    pool: &[PracticeItem],
    exclude_index: usize,
    correct_answer: &str,
    count: usize,
    rng: &mut R,
) -> Vec<String> {
    let correct_key = normalize(correct_answer);
    let mut candidates: Vec<&str> = pool
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != exclude_index)
        .map(|(_, item)| item.answer())
        .filter(|answer| normalize(answer) != correct_key)
        .collect();
    candidates.shuffle(rng);

    let mut options: Vec<String> = Vec::with_capacity(count.min(candidates.len()) + 1);
    options.push(correct_answer.to_owned());
    options.extend(candidates.into_iter().take(count).map(str::to_owned));
    options.shuffle(rng);
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanzi_core::model::{ItemId, SourceKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(answers: &[&str]) -> Vec<PracticeItem> {
        answers
            .iter()
            .zip(1_u128..)
            .map(|(answer, n)| {
                PracticeItem::new(
                    ItemId::from_u128(n),
                    format!("q{n}"),
                    *answer,
                    SourceKind::StudySet,
                )
            })
            .collect()
    }

    #[test]
    fn five_item_pool_yields_four_options_with_one_correct() {
        let pool = pool(&["A", "C", "B", "D", "E"]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let options = sample(&pool, 2, "B", 3, &mut rng);
            assert_eq!(options.len(), 4);
            assert_eq!(options.iter().filter(|o| *o == "B").count(), 1);
        }
    }

    #[test]
    fn small_pool_gives_fewer_options() {
        let pool = pool(&["hello", "goodbye"]);
        let mut rng = StdRng::seed_from_u64(7);
        let options = sample(&pool, 0, "hello", DEFAULT_DISTRACTORS, &mut rng);
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn option_count_is_min_of_count_plus_one_and_pool() {
        for size in 1..8 {
            let answers: Vec<String> = (0..size).map(|i| format!("a{i}")).collect();
            let refs: Vec<&str> = answers.iter().map(String::as_str).collect();
            let pool = pool(&refs);
            let mut rng = StdRng::seed_from_u64(size as u64);
            let options = sample(&pool, 0, "a0", DEFAULT_DISTRACTORS, &mut rng);
            assert_eq!(options.len(), (DEFAULT_DISTRACTORS + 1).min(size));
        }
    }

    #[test]
    fn answers_equal_to_the_correct_one_are_not_distractors() {
        let pool = pool(&["Water", "water ", "fire"]);
        let mut rng = StdRng::seed_from_u64(1);
        let options = sample(&pool, 0, "Water", 3, &mut rng);
        assert_eq!(options.len(), 2);
        assert!(options.contains(&"fire".to_owned()));
    }

    #[test]
    fn duplicate_distractor_text_is_tolerated() {
        let pool = pool(&["yes", "no", "no"]);
        let mut rng = StdRng::seed_from_u64(3);
        let options = sample(&pool, 0, "yes", 3, &mut rng);
        assert_eq!(options.iter().filter(|o| *o == "no").count(), 2);
    }

    #[test]
    fn correct_answer_position_varies() {
        let pool = pool(&["A", "B", "C", "D", "E"]);
        let mut seen = [false; 4];
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let options = sample(&pool, 0, "A", 3, &mut rng);
            if let Some(pos) = options.iter().position(|o| o == "A") {
                seen[pos] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
