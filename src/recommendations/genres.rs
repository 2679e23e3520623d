//! Genre vocabulary offered to users when picking preferences

pub const SUPPORTED_GENRES: &[&str] = &[
    "Pop", "Hip-Hop", "Rock", "Indie", "Electronic", "Jazz", "Dance", "R&B", "House", "Classical",
    "Reggae", "Soul", "Country", "Metal", "Techno", "Latin", "Punk", "Blues", "Ambient", "Acoustic",
    "Folk", "Alternative", "K-Pop", "Chill", "Lo-Fi", "EDM", "Disco", "Trance", "Ska", "Gospel",
    "Funk", "Garage", "Grunge", "Synth-Pop", "Opera", "Bluegrass", "Film Scores", "World Music",
    "Samba", "Tango",
];

pub fn is_supported(genre: &str) -> bool {
    SUPPORTED_GENRES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(genre))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        assert!(is_supported("hip-hop"));
        assert!(is_supported("LO-FI"));
        assert!(!is_supported("vaporwave"));
    }
}
