pub fn strbool(value: &str) -> bool {
    ["true", "True", "t", "T", "1"].contains(&value)
}

pub fn content_digest(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("T", true)]
    #[case("0", false)]
    #[case("no", false)]
    fn test_strbool(#[case] value: &str, #[case] expected: bool) {
        assert_eq!(strbool(value), expected);
    }

    #[test]
    fn test_content_digest() {
        assert_eq!(content_digest(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_ne!(content_digest("a"), content_digest("b"));
    }
}
