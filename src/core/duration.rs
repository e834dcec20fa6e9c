use super::locale::Locale;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phrasing {
    Chinese,
    English,
}

impl Phrasing {
    fn for_locale(locale: &Locale) -> Self {
        match locale.language() {
            "EN" => Phrasing::English,
            _ => Phrasing::Chinese,
        }
    }

    fn years(self, n: u32) -> String {
        match self {
            Phrasing::Chinese => format!("{n} 年"),
            Phrasing::English if n == 1 => "1 year".to_string(),
            Phrasing::English => format!("{n} years"),
        }
    }

    fn months(self, n: u32) -> String {
        match self {
            Phrasing::Chinese => format!("{n} 个月"),
            Phrasing::English if n == 1 => "1 month".to_string(),
            Phrasing::English => format!("{n} months"),
        }
    }

    fn over(self, horizon_years: u32) -> String {
        match self {
            Phrasing::Chinese => format!("超过 {horizon_years} 年"),
            Phrasing::English => format!("Over {horizon_years} years"),
        }
    }
}

/// Renders a month count as years and months. Zero years shows months only,
/// zero leftover months shows years only. `None` renders the "over horizon"
/// phrase.
pub fn format_duration(months: Option<u32>, locale: &Locale, horizon_years: u32) -> String {
    let phrasing = Phrasing::for_locale(locale);
    let Some(months) = months else {
        return phrasing.over(horizon_years);
    };

    let years = months / 12;
    let remaining = months % 12;
    if years == 0 {
        return phrasing.months(remaining);
    }
    if remaining == 0 {
        return phrasing.years(years);
    }
    format!("{} {}", phrasing.years(years), phrasing.months(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_durations() {
        let en = Locale::en();
        assert_eq!(format_duration(Some(0), &en, 50), "0 months");
        assert_eq!(format_duration(Some(1), &en, 50), "1 month");
        assert_eq!(format_duration(Some(11), &en, 50), "11 months");
        assert_eq!(format_duration(Some(12), &en, 50), "1 year");
        assert_eq!(format_duration(Some(13), &en, 50), "1 year 1 month");
        assert_eq!(format_duration(Some(14), &en, 50), "1 year 2 months");
        assert_eq!(format_duration(Some(24), &en, 50), "2 years");
        assert_eq!(format_duration(Some(230), &en, 50), "19 years 2 months");
        assert_eq!(format_duration(None, &en, 50), "Over 50 years");
    }

    #[test]
    fn chinese_durations() {
        let cn = Locale::cn();
        assert_eq!(format_duration(Some(0), &cn, 50), "0 个月");
        assert_eq!(format_duration(Some(12), &cn, 50), "1 年");
        assert_eq!(format_duration(Some(14), &cn, 50), "1 年 2 个月");
        assert_eq!(format_duration(None, &cn, 50), "超过 50 年");
    }

    #[test]
    fn regional_and_unknown_tags() {
        let en_gb = Locale::new("en-gb").expect("valid");
        assert_eq!(format_duration(Some(36), &en_gb, 50), "3 years");

        let fr = Locale::new("FR").expect("valid");
        assert_eq!(format_duration(Some(5), &fr, 50), "5 个月");
    }

    #[test]
    fn unreached_phrase_follows_horizon() {
        assert_eq!(format_duration(None, &Locale::en(), 30), "Over 30 years");
    }
}
