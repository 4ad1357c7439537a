// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;

use lazy_static::lazy_static;

// Confusable characters folded onto a canonical upper-case ASCII form.
#[rustfmt::skip]
const EQUIVALENTS: &[(char, char)] = &[
    // Digits and symbols commonly used as letters.
    ('0', 'O'), ('1', 'L'), ('|', 'L'), ('!', 'L'), ('3', 'E'), ('4', 'A'),
    ('5', 'S'), ('7', 'T'), ('8', 'B'), ('@', 'A'), ('$', 'S'), ('€', 'E'),
    ('I', 'L'), ('i', 'L'), ('l', 'L'),
    // Cyrillic.
    ('А', 'A'), ('а', 'A'), ('В', 'B'), ('в', 'B'), ('Е', 'E'), ('е', 'E'),
    ('К', 'K'), ('к', 'K'), ('М', 'M'), ('м', 'M'), ('Н', 'H'), ('н', 'H'),
    ('О', 'O'), ('о', 'O'), ('Р', 'P'), ('р', 'P'), ('С', 'C'), ('с', 'C'),
    ('Т', 'T'), ('т', 'T'), ('У', 'Y'), ('у', 'Y'), ('Х', 'X'), ('х', 'X'),
    ('І', 'L'), ('і', 'L'), ('Ј', 'J'), ('ј', 'J'), ('Ѕ', 'S'), ('ѕ', 'S'),
    // Greek.
    ('Α', 'A'), ('α', 'A'), ('Β', 'B'), ('β', 'B'), ('Ε', 'E'), ('ε', 'E'),
    ('Ζ', 'Z'), ('Η', 'H'), ('Ι', 'L'), ('ι', 'L'), ('Κ', 'K'), ('κ', 'K'),
    ('Μ', 'M'), ('Ν', 'N'), ('Ο', 'O'), ('ο', 'O'), ('Ρ', 'P'), ('ρ', 'P'),
    ('Τ', 'T'), ('τ', 'T'), ('Υ', 'Y'), ('υ', 'Y'), ('Χ', 'X'), ('χ', 'X'),
    // Latin variants.
    ('à', 'A'), ('á', 'A'), ('â', 'A'), ('ä', 'A'), ('å', 'A'), ('À', 'A'),
    ('Á', 'A'), ('Â', 'A'), ('Ä', 'A'), ('Å', 'A'), ('ç', 'C'), ('Ç', 'C'),
    ('è', 'E'), ('é', 'E'), ('ê', 'E'), ('ë', 'E'), ('È', 'E'), ('É', 'E'),
    ('ì', 'L'), ('í', 'L'), ('î', 'L'), ('ï', 'L'), ('ñ', 'N'), ('Ñ', 'N'),
    ('ò', 'O'), ('ó', 'O'), ('ô', 'O'), ('ö', 'O'), ('ø', 'O'), ('Ò', 'O'),
    ('Ó', 'O'), ('Ô', 'O'), ('Ö', 'O'), ('Ø', 'O'), ('ù', 'U'), ('ú', 'U'),
    ('û', 'U'), ('ü', 'U'), ('Ù', 'U'), ('Ú', 'U'), ('Û', 'U'), ('Ü', 'U'),
    ('ý', 'Y'), ('ÿ', 'Y'), ('Ý', 'Y'),
    // Fullwidth forms are handled arithmetically below.
];

lazy_static! {
    static ref EQUIVSET: HashMap<char, char> = EQUIVALENTS.iter().copied().collect();
}

fn fold_char(c: char) -> char {
    if let Some(mapped) = EQUIVSET.get(&c) {
        return *mapped;
    }
    // Fullwidth ASCII variants (U+FF01..U+FF5E).
    if ('\u{FF01}'..='\u{FF5E}').contains(&c) {
        if let Some(ascii) = char::from_u32(c as u32 - 0xFEE0) {
            return fold_char(ascii);
        }
    }
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => EQUIVSET.get(&u).copied().unwrap_or(u),
        _ => c,
    }
}

/// Folds look-alike characters together so that `ccnorm("V1agra")` equals
/// `ccnorm("VIAGRA")`.
pub fn normalize(s: &str) -> String {
    s.chars().map(fold_char).collect()
}
