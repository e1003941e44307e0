//! Title normalization pipeline for catalog matching.
//!
//! External tier sources disagree on encoding conventions for the same
//! title: half- vs full-width characters, stylized Unicode look-alikes,
//! HTML-escaped vs literal characters, inconsistent dashes and spacing.
//! Every import source and every catalog key goes through this one
//! pipeline; the step order is load-bearing (later steps assume earlier
//! ones already ran).

/// How parenthesized groups are treated during normalization.
///
/// Some sources encode the chart inside trailing parentheses ("(H)"), and
/// others append edition subtitles ("(IIDX EDITION)") that the catalog may
/// or may not carry. The catalog index keeps one key per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParenMode {
    /// Keep parenthesized groups, stripping only a trailing chart-suffix
    /// token such as "(H)", "(L)", "(A)" or "(HCN)".
    Keep,
    /// Drop every parenthesized group.
    StripAll,
}

/// Apply the full normalization pipeline, producing a lowercase,
/// whitespace-collapsed, width-unified comparison key.
///
/// Steps in order:
/// 1. Inline markup removal (`<br>` to space, other tags dropped)
/// 2. HTML/XML entity decoding (named + numeric)
/// 3. Parenthetical handling per [`ParenMode`]
/// 4. Wave-dash / dash / quote canonicalization
/// 5. Half-width katakana to full-width (voiced pairs collapse first)
/// 6. Full-width ASCII to half-width (fixed U+FEE0 offset)
/// 7. Accent and look-alike letter folding
/// 8. Whitespace collapse
/// 9. Transliteration quirks and known typo corrections
/// 10. Lowercase
pub fn normalize(raw: &str, parens: ParenMode) -> String {
    let s = strip_markup(raw);
    let s = decode_entities(&s);
    let s = match parens {
        ParenMode::Keep => strip_chart_suffix(&s),
        ParenMode::StripAll => strip_paren_groups(&s),
    };
    let s = canonicalize_glyphs(&s);
    let s = widen_halfwidth_kana(&s);
    let s = narrow_fullwidth_ascii(&s);
    let s = fold_letters(&s);
    let s = collapse_whitespace(&s);
    let s = apply_quirks(&s);
    s.to_lowercase()
}

/// Last-resort comparison key: [`normalize`] with `ParenMode::Keep`, then
/// every character outside `[a-z0-9]`, hiragana, katakana and the CJK
/// ideograph range removed.
///
/// Used when punctuation and spacing differ unpredictably between sources.
pub fn ultra_normalize(raw: &str) -> String {
    normalize(raw, ParenMode::Keep)
        .chars()
        .filter(|&c| is_ultra_char(c))
        .collect()
}

/// Ultra key of the strip-all-parens variant, for entities whose trailing
/// parenthetical is an edition subtitle rather than part of the title.
pub fn ultra_normalize_no_parens(raw: &str) -> String {
    normalize(raw, ParenMode::StripAll)
        .chars()
        .filter(|&c| is_ultra_char(c))
        .collect()
}

fn is_ultra_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || ('\u{3040}'..='\u{309F}').contains(&c) // hiragana
        || ('\u{30A0}'..='\u{30FF}').contains(&c) // katakana
        || ('\u{4E00}'..='\u{9FAF}').contains(&c) // CJK ideographs
}

// ── Step 1: inline markup ─────────────────────────────────────────────

/// Remove inline markup carried over from the score database (`<span
/// style=...>`, `<br>`). `<br>` becomes a space so multi-line titles keep
/// a word boundary. A `<` not opening something tag-shaped (e.g. "<3") is
/// kept literally.
fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('<') {
        let tag_rest = &rest[start + 1..];
        let end = tag_rest.find('>');
        let body = match end {
            Some(e) => &tag_rest[..e],
            None => tag_rest,
        };
        let looks_like_tag = body
            .trim_start_matches('/')
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if !looks_like_tag {
            out.push_str(&rest[..start + 1]);
            rest = tag_rest;
            continue;
        }
        out.push_str(&rest[..start]);
        let name: String = body
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if name.eq_ignore_ascii_case("br") {
            out.push(' ');
        }
        rest = match end {
            Some(e) => &tag_rest[e + 1..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

// ── Step 2: entity decoding ───────────────────────────────────────────

/// Named entities observed in source documents and catalog titles.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("iexcl", "¡"),
    ("cent", "¢"),
    ("pound", "£"),
    ("curren", "¤"),
    ("yen", "¥"),
    ("brvbar", "¦"),
    ("sect", "§"),
    ("uml", "¨"),
    ("copy", "©"),
    ("ordf", "ª"),
    ("laquo", "«"),
    ("not", "¬"),
    ("shy", ""),
    ("reg", "®"),
    ("macr", "¯"),
    ("deg", "°"),
    ("plusmn", "±"),
    ("sup2", "²"),
    ("sup3", "³"),
    ("acute", "´"),
    ("micro", "µ"),
    ("para", "¶"),
    ("middot", "·"),
    ("cedil", "¸"),
    ("sup1", "¹"),
    ("ordm", "º"),
    ("raquo", "»"),
    ("frac14", "¼"),
    ("frac12", "½"),
    ("frac34", "¾"),
    ("iquest", "¿"),
    ("times", "×"),
    ("divide", "÷"),
    ("aelig", "æ"),
    ("oslash", "ø"),
    ("Oslash", "Ø"),
    ("Uuml", "Ü"),
    ("eacute", "é"),
    ("hearts", "♥"),
];

/// Decode HTML/XML character entities (named, decimal, hex) in one pass.
/// Unknown entities are kept literally.
fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let semi = after.find(';').filter(|&i| i > 0 && i <= 10);
        let Some(semi) = semi else {
            out.push('&');
            rest = after;
            continue;
        };
        let name = &after[..semi];
        let decoded = decode_entity_name(name);
        match decoded {
            Some(text) => out.push_str(&text),
            None => {
                out.push('&');
                out.push_str(name);
                out.push(';');
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    out
}

fn decode_entity_name(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            num.parse::<u32>().ok()?
        };
        return char::from_u32(code).map(String::from);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, text)| (*text).to_string())
}

// ── Step 3: parentheticals ────────────────────────────────────────────

/// Chart-suffix tokens some sources append to titles, e.g. "Song (H)".
const CHART_SUFFIXES: &[&str] = &["l", "hcn", "a", "h"];

/// Strip a single trailing chart-suffix parenthetical, keeping every other
/// parenthesized group.
fn strip_chart_suffix(s: &str) -> String {
    let t = s.trim_end();
    if t.ends_with(')') {
        if let Some(open) = t.rfind('(') {
            let inner = &t[open + 1..t.len() - 1];
            if CHART_SUFFIXES.contains(&inner.to_ascii_lowercase().as_str()) {
                return t[..open].to_string();
            }
        }
    }
    s.to_string()
}

/// Drop every `(...)` group. An unmatched `(` is kept literally.
fn strip_paren_groups(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('(') {
        match rest[start..].find(')') {
            Some(off) => {
                out.push_str(&rest[..start]);
                rest = &rest[start + off + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

// ── Step 4: glyph canonicalization ────────────────────────────────────

/// Unify the wave-dash/tilde family, the dash/minus family, and curly
/// quotes. The canonical dash is the katakana prolonged-sound mark; the
/// canonical tilde is the full-width form (narrowed to `~` in step 6).
fn canonicalize_glyphs(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{301C}' => '～',                                      // wave dash
            '－' | '—' | '–' | '−' | '‐' | '-' => 'ー',             // dash family
            '“' | '”' => '"',
            '‘' | '’' => '\'',
            c => c,
        })
        .collect()
}

// ── Step 5: half-width katakana ───────────────────────────────────────

fn voiced_kana(base: char) -> Option<char> {
    Some(match base {
        'ｶ' => 'ガ',
        'ｷ' => 'ギ',
        'ｸ' => 'グ',
        'ｹ' => 'ゲ',
        'ｺ' => 'ゴ',
        'ｻ' => 'ザ',
        'ｼ' => 'ジ',
        'ｽ' => 'ズ',
        'ｾ' => 'ゼ',
        'ｿ' => 'ゾ',
        'ﾀ' => 'ダ',
        'ﾁ' => 'ヂ',
        'ﾂ' => 'ヅ',
        'ﾃ' => 'デ',
        'ﾄ' => 'ド',
        'ﾊ' => 'バ',
        'ﾋ' => 'ビ',
        'ﾌ' => 'ブ',
        'ﾍ' => 'ベ',
        'ﾎ' => 'ボ',
        'ｳ' => 'ヴ',
        _ => return None,
    })
}

fn semivoiced_kana(base: char) -> Option<char> {
    Some(match base {
        'ﾊ' => 'パ',
        'ﾋ' => 'ピ',
        'ﾌ' => 'プ',
        'ﾍ' => 'ペ',
        'ﾎ' => 'ポ',
        _ => return None,
    })
}

fn plain_kana(c: char) -> Option<char> {
    Some(match c {
        'ｱ' => 'ア',
        'ｲ' => 'イ',
        'ｳ' => 'ウ',
        'ｴ' => 'エ',
        'ｵ' => 'オ',
        'ｶ' => 'カ',
        'ｷ' => 'キ',
        'ｸ' => 'ク',
        'ｹ' => 'ケ',
        'ｺ' => 'コ',
        'ｻ' => 'サ',
        'ｼ' => 'シ',
        'ｽ' => 'ス',
        'ｾ' => 'セ',
        'ｿ' => 'ソ',
        'ﾀ' => 'タ',
        'ﾁ' => 'チ',
        'ﾂ' => 'ツ',
        'ﾃ' => 'テ',
        'ﾄ' => 'ト',
        'ﾅ' => 'ナ',
        'ﾆ' => 'ニ',
        'ﾇ' => 'ヌ',
        'ﾈ' => 'ネ',
        'ﾉ' => 'ノ',
        'ﾊ' => 'ハ',
        'ﾋ' => 'ヒ',
        'ﾌ' => 'フ',
        'ﾍ' => 'ヘ',
        'ﾎ' => 'ホ',
        'ﾏ' => 'マ',
        'ﾐ' => 'ミ',
        'ﾑ' => 'ム',
        'ﾒ' => 'メ',
        'ﾓ' => 'モ',
        'ﾔ' => 'ヤ',
        'ﾕ' => 'ユ',
        'ﾖ' => 'ヨ',
        'ﾗ' => 'ラ',
        'ﾘ' => 'リ',
        'ﾙ' => 'ル',
        'ﾚ' => 'レ',
        'ﾛ' => 'ロ',
        'ﾜ' => 'ワ',
        'ｦ' => 'ヲ',
        'ﾝ' => 'ン',
        'ｧ' => 'ァ',
        'ｨ' => 'ィ',
        'ｩ' => 'ゥ',
        'ｪ' => 'ェ',
        'ｫ' => 'ォ',
        'ｯ' => 'ッ',
        'ｬ' => 'ャ',
        'ｭ' => 'ュ',
        'ｮ' => 'ョ',
        '｡' => '。',
        '､' => '、',
        'ｰ' => 'ー',
        '｢' => '「',
        '｣' => '」',
        '･' => '・',
        _ => return None,
    })
}

/// Map half-width katakana to full-width. A base character followed by a
/// half-width voiced/semi-voiced sound mark (U+FF9E / U+FF9F) collapses to
/// the single composed full-width character.
fn widen_halfwidth_kana(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mark = chars.get(i + 1).copied();
        if mark == Some('\u{FF9E}') {
            if let Some(composed) = voiced_kana(c) {
                out.push(composed);
                i += 2;
                continue;
            }
        }
        if mark == Some('\u{FF9F}') {
            if let Some(composed) = semivoiced_kana(c) {
                out.push(composed);
                i += 2;
                continue;
            }
        }
        out.push(plain_kana(c).unwrap_or(c));
        i += 1;
    }
    out
}

// ── Step 6: full-width ASCII ──────────────────────────────────────────

/// Convert full-width Latin letters/digits/punctuation (U+FF01–U+FF5E) to
/// half-width via the fixed codepoint offset, and the ideographic space to
/// an ASCII space.
fn narrow_fullwidth_ascii(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '！'..='～' => {
                char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
            }
            '\u{3000}' => ' ',
            c => c,
        })
        .collect()
}

// ── Step 7: letter folding ────────────────────────────────────────────

/// Fold accented Latin letters to their base form, and the Cyrillic/Greek
/// look-alikes titles use stylistically to their Latin equivalents.
/// Decorative marks are dropped outright.
///
/// This is the union of the folding tables that had drifted apart across
/// the per-source import scripts; `Ø` folds to `0` (not `O`) so stylized
/// zero titles match their plain catalog spelling.
fn fold_letters(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'ø' => out.push('o'),
            'Ø' => out.push('0'),
            'ä' => out.push('a'),
            'Ä' => out.push('A'),
            'ö' => out.push('o'),
            'Ö' => out.push('O'),
            'ü' => out.push('u'),
            'Ü' => out.push('U'),
            'é' | 'è' | 'ê' => out.push('e'),
            'É' => out.push('E'),
            'á' | 'à' | 'â' => out.push('a'),
            'í' | 'ì' | 'î' => out.push('i'),
            'ó' | 'ò' | 'ô' => out.push('o'),
            'ú' | 'ù' | 'û' => out.push('u'),
            'ō' => out.push('o'),
            'Ō' => out.push('O'),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            '¡' => out.push('i'),
            '¿' => out.push('?'),
            'И' => out.push('N'),
            'А' => out.push('A'),
            'М' => out.push('M'),
            'Α' => out.push('A'),
            'Φ' => out.push('O'),
            'Σ' => out.push('S'),
            'Χ' => out.push('X'),
            'Ξ' => out.push_str("XI"),
            'Θ' => out.push_str("THETA"),
            'Ω' => out.push_str("OMEGA"),
            'α' => out.push_str("alpha"),
            'β' => out.push_str("beta"),
            '≡' => out.push('='),
            '†' | '♡' | '☆' | '★' => {}
            c => out.push(c),
        }
    }
    out
}

// ── Step 8: whitespace ────────────────────────────────────────────────

/// Trim and collapse whitespace runs to a single ASCII space.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Step 9: quirks ────────────────────────────────────────────────────

/// Known typo corrections observed across community tier lists.
const TYPO_FIXES: &[(&str, &str)] = &[
    ("altnator", "ALTNATHOR"),
    ("rebuld", "REBUILD"),
    ("enc rypiton", "ENCRYPTION"),
    ("encrypiton", "ENCRYPTION"),
    ("ganymade", "GANYMEDE"),
    ("partcle", "PARTICLE"),
    ("valut of heavn", "VAULT OF HEAVEN"),
];

/// Apply transliteration quirks: "remix" in any case becomes the katakana
/// form, the bare "リミ" abbreviation expands unless it is already part of
/// "リミックス", and known tier-list typos are corrected.
fn apply_quirks(s: &str) -> String {
    let mut result = replace_ascii_ci(s, "remix", "リミックス");
    if result.contains("リミ") && !result.contains("リミックス") {
        result = result.replace("リミ", "リミックス");
    }
    for (typo, fix) in TYPO_FIXES {
        result = replace_ascii_ci(&result, typo, fix);
    }
    result
}

/// Replace every occurrence of an ASCII needle, case-insensitively.
fn replace_ascii_ci(s: &str, needle: &str, rep: &str) -> String {
    let lower = s.to_ascii_lowercase();
    if !lower.contains(needle) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for (pos, _) in lower.match_indices(needle) {
        if pos < last {
            continue; // overlapping occurrence already consumed
        }
        out.push_str(&s[last..pos]);
        out.push_str(rep);
        last = pos + needle.len();
    }
    out.push_str(&s[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        normalize(s, ParenMode::Keep)
    }

    // ── Markup & entities ─────────────────────────────────────────────

    #[test]
    fn strips_inline_markup() {
        assert_eq!(norm("<span style=\"color:red\">GAMBOL</span>"), "gambol");
        assert_eq!(norm("long title<br>second line"), "long title second line");
        assert_eq!(norm("A<br />B"), "a b");
    }

    #[test]
    fn keeps_non_tag_angle_bracket() {
        assert_eq!(norm("I <3 U"), "i <3 u");
    }

    #[test]
    fn decodes_named_entities() {
        assert_eq!(norm("M&amp;M"), "m&m");
        assert_eq!(norm("&yen;480"), "¥480");
    }

    #[test]
    fn decodes_numeric_entities() {
        // &#332; is Ō, which then folds to O.
        assert_eq!(norm("&#332;"), "o");
        assert_eq!(norm("&#x3000;a"), "a");
    }

    #[test]
    fn unknown_entity_kept() {
        assert_eq!(norm("&zzz;"), "&zzz;");
    }

    // ── Parentheticals ────────────────────────────────────────────────

    #[test]
    fn keep_mode_strips_only_chart_suffix() {
        assert_eq!(norm("Sample Song (H)"), "sample song");
        assert_eq!(norm("Sample Song(HCN)"), "sample song");
        assert_eq!(
            norm("Bloody Tears (IIDX EDITION)"),
            "bloody tears (iidx edition)"
        );
    }

    #[test]
    fn strip_all_mode_drops_every_group() {
        assert_eq!(
            normalize("Bloody Tears (IIDX EDITION)", ParenMode::StripAll),
            "bloody tears"
        );
        assert_eq!(normalize("a (b) c (d)", ParenMode::StripAll), "a c");
    }

    // ── Glyphs, width, kana ───────────────────────────────────────────

    #[test]
    fn canonicalizes_dashes_and_tilde() {
        assert_eq!(norm("A−B"), norm("A－B"));
        assert_eq!(norm("A—B"), norm("A-B"));
        // Wave dash and full-width tilde unify (and narrow to '~').
        assert_eq!(norm("冥\u{301C}"), "冥~");
        assert_eq!(norm("冥～"), "冥~");
    }

    #[test]
    fn halfwidth_katakana_with_marks() {
        // Half-width with voiced marks and half-width dash.
        assert_eq!(norm("ﾋﾞｮ-ﾋﾞｭ-"), "ビョービュー");
        assert_eq!(norm("ｳﾞｧﾙｷﾘｰ"), "ヴァルキリー");
        assert_eq!(norm("ﾊﾟﾗﾀﾞｲｽ"), "パラダイス");
    }

    #[test]
    fn width_invariance() {
        assert_eq!(norm("ｱｲｳ"), norm("アイウ"));
        assert_eq!(norm("ＡＢＣ１２３"), "abc123");
        assert_eq!(norm("ＧＯＬＤ　ＲＵＳＨ"), "gold rush");
    }

    // ── Letter folding ────────────────────────────────────────────────

    #[test]
    fn folds_accents() {
        assert_eq!(norm("CODE:Ø"), "code:0");
        assert_eq!(norm("møøse"), "moose");
        assert_eq!(norm("Übertreffen"), "ubertreffen");
        assert_eq!(norm("æther"), "aether");
    }

    #[test]
    fn folds_lookalikes() {
        assert_eq!(norm("ИEO"), "neo");
        assert_eq!(norm("ΧΧΧ"), "xxx");
        assert_eq!(norm("Φ"), "o");
    }

    #[test]
    fn drops_decorations() {
        assert_eq!(norm("☆shining☆"), "shining");
        assert_eq!(norm("†渚の小悪魔†"), "渚の小悪魔");
    }

    // ── Whitespace & quirks ───────────────────────────────────────────

    #[test]
    fn collapses_whitespace() {
        assert_eq!(norm("  A   B　C  "), "a b c");
    }

    #[test]
    fn remix_quirks() {
        assert_eq!(norm("夏祭りリミ"), "夏祭りリミックス");
        assert_eq!(norm("夏祭りリミックス"), "夏祭りリミックス");
        assert_eq!(norm("Tripping contact REMIX"), "tripping contact リミックス");
    }

    #[test]
    fn typo_corrections() {
        assert_eq!(norm("ALTNATOR"), "altnathor");
        assert_eq!(norm("VALUT OF HEAVN"), "vault of heaven");
    }

    // ── Pipeline properties ───────────────────────────────────────────

    const CORPUS: &[&str] = &[
        "ﾋﾞｮ-ﾋﾞｭ-",
        "CODE:Ø",
        "Bloody Tears (IIDX EDITION)",
        "ＧＯＬＤ　ＲＵＳＨ",
        "M&amp;M",
        "冥\u{301C}freedom dive\u{301C}",
        "†渚の小悪魔†",
        "夏祭りリミ",
        "quell～the seventh slave～",
        "<span style=\"x\">A</span><br>B",
        "I <3 U",
        "",
        "   ",
    ];

    #[test]
    fn normalize_is_idempotent() {
        for s in CORPUS {
            let once = norm(s);
            assert_eq!(norm(&once), once, "not idempotent for {s:?}");
            let once_np = normalize(s, ParenMode::StripAll);
            assert_eq!(
                normalize(&once_np, ParenMode::StripAll),
                once_np,
                "strip-all not idempotent for {s:?}"
            );
        }
    }

    #[test]
    fn ultra_contains_only_allowed_ranges() {
        for s in CORPUS {
            for c in ultra_normalize(s).chars() {
                assert!(
                    c.is_ascii_lowercase() || c.is_ascii_digit() || is_ultra_char(c),
                    "unexpected char {c:?} in ultra key of {s:?}"
                );
                assert!(!c.is_ascii_uppercase());
                assert!(!c.is_whitespace());
            }
        }
    }

    #[test]
    fn ultra_strips_punctuation() {
        assert_eq!(ultra_normalize("hello, world!"), "helloworld");
        assert_eq!(ultra_normalize("CROSS ROAD ~Left Story~"), "crossroadleftstory");
        assert_eq!(ultra_normalize("ビョービュー"), "ビョービュー");
    }
}
