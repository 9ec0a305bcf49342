//! Cheap keyword pre-filter run before the classifier.
//!
//! Only terms that are unambiguous for non-wine listings belong here. Anything
//! this lets through is still checked by the model, so a missed exclusion
//! costs one model call while a wrong exclusion loses a wine.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXCLUDED: Regex = Regex::new(concat!(
        "(?i)",
        // Other beverages
        "ビール|日本酒|ウィスキー|ウイスキー|リキュール",
        // Glassware, storage and serving accessories
        "|グラス|空き瓶|空瓶|コルク|保存容器|ワイン保存|ラック|冷蔵|ボトルホルダー|デキャンタ|ボトル栓|ストッパー",
        "|ワインセラー|ソムリエ|オープナー|しゃもじ|おつまみ",
        // Bundles
        "|セット|本まとめ|ケース買い",
        // English listings
        r"|\b(?:beer|sake|whiske?y|liqueur|vodka|gin|glass(?:es)?|opener|corkscrew|decanter|stopper|wine rack|gift set)\b",
    ))
    .unwrap();
}

/// True when the item name contains an exclusion term.
pub fn is_excluded(item_name: &str) -> bool {
    EXCLUDED.is_match(item_name)
}

/// The matched exclusion term, for logging.
pub fn exclusion_term(item_name: &str) -> Option<&str> {
    EXCLUDED.find(item_name).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_other_beverages_and_accessories() {
        assert!(is_excluded("クラフトビール 6缶"));
        assert!(is_excluded("純米大吟醸 日本酒 720ml"));
        assert!(is_excluded("ワイングラス 2脚"));
        assert!(is_excluded("赤ワイン 飲み比べ 6本セット"));
        assert!(is_excluded("Stainless Steel Wine OPENER"));
        assert!(is_excluded("Japanese Whisky 700ml"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(is_excluded("Premium BEER selection"));
        assert!(is_excluded("premium beer selection"));
        assert_eq!(exclusion_term("Crystal Glasses x2"), Some("Glasses"));
    }

    #[test]
    fn single_bottle_wines_pass() {
        assert!(!is_excluded("シャトー・マルゴー 2015 赤ワイン 750ml"));
        assert!(!is_excluded("Cloudy Bay Sauvignon Blanc 2022"));
        assert!(!is_excluded("Sunset Ridge Zinfandel"));
        assert!(!is_excluded("Chateau Gigondas Reserve"));
        assert_eq!(exclusion_term("Barolo DOCG 2018"), None);
    }

    #[test]
    fn storage_and_closure_terms_only_match_accessories() {
        assert!(!is_excluded("保存料無添加 赤ワイン 750ml"));
        assert!(!is_excluded("スクリュー栓 白ワイン"));
        assert!(is_excluded("真空ワイン保存ポンプ"));
        assert!(is_excluded("ガラス保存容器 1L"));
        assert!(is_excluded("シリコン ボトル栓 2個"));
    }
}
