use super::plural::{PluralCategory, get_plural_case};

fn cases(locale: &str, values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("{v}={}", get_plural_case(v, locale).as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn english_distinguishes_one_from_other() {
    insta::assert_snapshot!(cases("en", &["0", "1", "2", "1.0", "-1"]), @"0=other 1=one 2=other 1.0=other -1=one");
}

#[test]
fn region_and_case_are_ignored() {
    assert_eq!(get_plural_case("1", "en-US"), PluralCategory::One);
    assert_eq!(get_plural_case("1", "EN_gb"), PluralCategory::One);
    assert_eq!(get_plural_case("3", "ru-RU"), PluralCategory::Few);
}

#[test]
fn slavic_rules() {
    insta::assert_snapshot!(
        cases("ru", &["1", "2", "5", "11", "12", "21", "22", "25", "1.5"]),
        @"1=one 2=few 5=many 11=many 12=many 21=one 22=few 25=many 1.5=other"
    );
    insta::assert_snapshot!(cases("pl", &["1", "22", "25", "12"]), @"1=one 22=few 25=many 12=many");
}

#[test]
fn arabic_has_every_category() {
    insta::assert_snapshot!(
        cases("ar", &["0", "1", "2", "3", "11", "100"]),
        @"0=zero 1=one 2=two 3=few 11=many 100=other"
    );
}

#[test]
fn french_counts_zero_and_fractions_below_two_as_one() {
    insta::assert_snapshot!(cases("fr", &["0", "1.5", "2", "1000000"]), @"0=one 1.5=one 2=other 1000000=many");
}

#[test]
fn locales_without_plurals() {
    assert_eq!(get_plural_case("1", "ja"), PluralCategory::Other);
    assert_eq!(get_plural_case("1", "zh-Hant"), PluralCategory::Other);
}

#[test]
fn non_numbers_are_other() {
    assert_eq!(get_plural_case("many", "en"), PluralCategory::Other);
    assert_eq!(get_plural_case("", "en"), PluralCategory::Other);
    assert_eq!(get_plural_case("inf", "en"), PluralCategory::Other);
}
