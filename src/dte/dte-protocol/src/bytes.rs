// DTE transfer "bytes" are 16 bits wide and carry two characters, high byte first.

/// Packs two characters into one transfer word
pub fn pack(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}

/// Returns character `index` of a packed payload, masked to 7 bits
pub fn char_at(words: &[u16], index: usize) -> u8 {
    let word = words[index >> 1];
    let ch = if index & 1 == 0 { word >> 8 } else { word };
    (ch & 0o177) as u8
}

/// Packs a character string into transfer words; an odd tail is padded with NUL
pub fn pack_chars(chars: &[u8]) -> impl Iterator<Item = u16> + '_ {
    chars.chunks(2).map(|pair| match pair {
        [high, low] => pack(*high, *low),
        [high] => pack(*high, 0),
        _ => 0,
    })
}

/// Number of transfer words needed to carry `count` bytes
pub fn words_for(count: usize) -> usize {
    (count + 1) / 2
}
