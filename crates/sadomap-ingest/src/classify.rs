//! Category classifier.
//!
//! Flag columns decide first; when none is set, the free-text genre is matched
//! against a fixed keyword table; when nothing matches, the POI is
//! [`Category::Unspecified`]. The result depends only on its inputs.

use sadomap_core::Category;

/// Keyword → category, checked in order. Earlier entries come first in the
/// result.
const GENRE_KEYWORDS: &[(&str, Category)] = &[
    ("寿司", Category::Japanese),
    ("和食", Category::Japanese),
    ("蕎麦", Category::Japanese),
    ("そば", Category::Japanese),
    ("天ぷら", Category::Japanese),
    ("海鮮", Category::Japanese),
    ("定食", Category::Japanese),
    ("sushi", Category::Japanese),
    ("ラーメン", Category::Ramen),
    ("中華", Category::Chinese),
    ("餃子", Category::Chinese),
    ("イタリアン", Category::Western),
    ("パスタ", Category::Western),
    ("ピザ", Category::Western),
    ("洋食", Category::Western),
    ("フレンチ", Category::Western),
    ("ハンバーグ", Category::Western),
    ("ステーキ", Category::Western),
    ("カフェ", Category::Cafe),
    ("喫茶", Category::Cafe),
    ("コーヒー", Category::Cafe),
    ("スイーツ", Category::Sweets),
    ("ケーキ", Category::Sweets),
    ("パン", Category::Sweets),
    ("居酒屋", Category::Izakaya),
    ("バー", Category::Izakaya),
];

/// Boolean category columns of a row, already parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFlags {
    pub japanese: bool,
    pub western: bool,
    pub other: bool,
    pub retail: bool,
}

impl CategoryFlags {
    #[must_use]
    pub fn any(self) -> bool {
        self.japanese || self.western || self.other || self.retail
    }
}

/// Whether a flag cell reads as set.
#[must_use]
pub fn is_truthy(cell: &str) -> bool {
    matches!(
        cell.trim().to_lowercase().as_str(),
        "true" | "1" | "○" | "◯" | "yes" | "y" | "有" | "あり"
    )
}

/// Categories for a row. Never empty; the first entry is the primary
/// category.
#[must_use]
pub fn classify(flags: CategoryFlags, genre: &str) -> Vec<Category> {
    if flags.any() {
        return from_flags(flags);
    }

    let found = from_genre(genre);
    if found.is_empty() {
        vec![Category::Unspecified]
    } else {
        found
    }
}

fn from_flags(flags: CategoryFlags) -> Vec<Category> {
    let mut categories = Vec::with_capacity(3);
    match (flags.japanese, flags.western) {
        (true, true) => categories.push(Category::Fusion),
        (true, false) => categories.push(Category::Japanese),
        (false, true) => categories.push(Category::Western),
        (false, false) => {}
    }
    if flags.retail {
        categories.push(Category::Retail);
    }
    if flags.other {
        categories.push(Category::Other);
    }
    categories
}

fn from_genre(genre: &str) -> Vec<Category> {
    let genre = genre.trim().to_lowercase();
    if genre.is_empty() {
        return Vec::new();
    }

    let mut categories = Vec::new();
    for (keyword, category) in GENRE_KEYWORDS {
        if genre.contains(keyword) && !categories.contains(category) {
            categories.push(*category);
        }
    }
    categories
}
