//! Built-in starter catalog: the most frequent characters in modern Chinese,
//! plus the badges a local backend awards.

use hanzi_core::model::{Badge, BadgeCriterion, BadgeId, ItemId};

use crate::repository::{BadgeRule, CatalogEntry};

/// `(hanzi, pinyin, meaning)` ordered by frequency rank.
pub const COMMON_CHARACTERS: &[(&str, &str, &str)] = &[
    ("的", "de", "possessive particle"),
    ("一", "yī", "one"),
    ("是", "shì", "to be"),
    ("不", "bù", "not"),
    ("了", "le", "completed action marker"),
    ("人", "rén", "person"),
    ("我", "wǒ", "I, me"),
    ("在", "zài", "at, in"),
    ("有", "yǒu", "to have"),
    ("他", "tā", "he, him"),
    ("这", "zhè", "this"),
    ("中", "zhōng", "middle"),
    ("大", "dà", "big"),
    ("来", "lái", "to come"),
    ("上", "shàng", "up, above"),
    ("国", "guó", "country"),
    ("个", "gè", "measure word"),
    ("到", "dào", "to arrive"),
    ("说", "shuō", "to speak"),
    ("们", "men", "plural marker"),
    ("为", "wèi", "for"),
    ("子", "zǐ", "child"),
    ("和", "hé", "and"),
    ("你", "nǐ", "you"),
    ("地", "de", "adverbial particle"),
    ("出", "chū", "to go out"),
    ("道", "dào", "way, path"),
    ("也", "yě", "also"),
    ("时", "shí", "time"),
    ("年", "nián", "year"),
    ("得", "de", "complement particle"),
    ("就", "jiù", "then, at once"),
    ("那", "nà", "that"),
    ("要", "yào", "to want"),
    ("下", "xià", "down, below"),
    ("以", "yǐ", "by means of"),
    ("生", "shēng", "to be born"),
    ("会", "huì", "can, will"),
    ("自", "zì", "self"),
    ("着", "zhe", "continuous aspect marker"),
    ("去", "qù", "to go"),
    ("之", "zhī", "classical possessive"),
    ("过", "guò", "to pass"),
    ("家", "jiā", "home, family"),
    ("学", "xué", "to study"),
    ("对", "duì", "correct, towards"),
    ("可", "kě", "can, may"),
    ("她", "tā", "she, her"),
    ("里", "lǐ", "inside"),
    ("后", "hòu", "after, behind"),
];

/// Catalog entries for the first `limit` common characters (all when `None`).
///
/// Ids are derived from the rank so repeated seeding upserts the same rows.
#[must_use]
pub fn common_catalog(limit: Option<usize>) -> Vec<CatalogEntry> {
    COMMON_CHARACTERS
        .iter()
        .take(limit.unwrap_or(COMMON_CHARACTERS.len()))
        .zip(1_u32..)
        .map(|(&(hanzi, pinyin, meaning), rank)| CatalogEntry {
            id: ItemId::from_u128(0x6861_6e7a_6900_0000 + u128::from(rank)),
            hanzi: hanzi.to_owned(),
            pinyin: pinyin.to_owned(),
            meaning: meaning.to_owned(),
            frequency_rank: rank,
        })
        .collect()
}

/// `(name, description, icon, criterion)` for the built-in badges.
pub const STARTER_BADGES: &[(&str, &str, &str, BadgeCriterion)] = &[
    ("First Stroke", "Complete your first character", "✍️", BadgeCriterion::Practiced(1)),
    ("Diligent Hand", "Complete 100 characters", "📜", BadgeCriterion::Practiced(100)),
    ("Ten Mastered", "Master 10 characters", "🥉", BadgeCriterion::Mastered(10)),
    ("Fifty Mastered", "Master 50 characters", "🥈", BadgeCriterion::Mastered(50)),
    ("Three Day Streak", "Practice three days in a row", "🔥", BadgeCriterion::Streak(3)),
    ("Week Streak", "Practice seven days in a row", "🏮", BadgeCriterion::Streak(7)),
];

/// Starter badges with stable ids.
#[must_use]
pub fn starter_badges() -> Vec<BadgeRule> {
    STARTER_BADGES
        .iter()
        .zip(1_u128..)
        .map(|(&(name, description, icon, criterion), n)| BadgeRule {
            badge: Badge {
                id: BadgeId::from_u128(0x6261_6467_6500_0000 + n),
                name: name.to_owned(),
                description: description.to_owned(),
                icon: icon.to_owned(),
            },
            criterion,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ranks_start_at_one_and_ids_are_stable() {
        let first = common_catalog(Some(3));
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].hanzi, "的");
        assert_eq!(first[0].frequency_rank, 1);
        assert_eq!(common_catalog(Some(1))[0].id, first[0].id);
    }

    #[test]
    fn starter_badges_have_unique_names_and_ids() {
        let badges = starter_badges();
        let names: HashSet<&str> = badges.iter().map(|r| r.badge.name.as_str()).collect();
        let ids: HashSet<_> = badges.iter().map(|r| r.badge.id).collect();
        assert_eq!(names.len(), STARTER_BADGES.len());
        assert_eq!(ids.len(), STARTER_BADGES.len());
    }

    #[test]
    fn glyphs_are_unique() {
        let glyphs: HashSet<&str> = COMMON_CHARACTERS.iter().map(|c| c.0).collect();
        assert_eq!(glyphs.len(), COMMON_CHARACTERS.len());
    }
}
