//! Country-name heuristic
//!
//! Decides whether a query looks like a country before the country service is
//! asked. Matching is approximate: a person called "Jordan" will match.

use strsim::damerau_levenshtein;

/// Names accepted by the country-metadata service, in display order
static COUNTRY_NAMES: &[&str] = &[
    "Afghanistan", "Albania", "Algeria", "Andorra", "Angola",
    "Antigua and Barbuda", "Argentina", "Armenia", "Australia", "Austria",
    "Azerbaijan", "Bahamas", "Bahrain", "Bangladesh", "Barbados",
    "Belarus", "Belgium", "Belize", "Benin", "Bhutan",
    "Bolivia", "Bosnia and Herzegovina", "Botswana", "Brazil", "Brunei",
    "Bulgaria", "Burkina Faso", "Burundi", "Cambodia", "Cameroon",
    "Canada", "Cape Verde", "Central African Republic", "Chad", "Chile",
    "China", "Colombia", "Comoros", "Costa Rica", "Croatia",
    "Cuba", "Cyprus", "Czechia", "Denmark", "Djibouti",
    "Dominica", "Dominican Republic", "DR Congo", "Ecuador", "Egypt",
    "El Salvador", "Equatorial Guinea", "Eritrea", "Estonia", "Eswatini",
    "Ethiopia", "Fiji", "Finland", "France", "Gabon",
    "Gambia", "Georgia", "Germany", "Ghana", "Greece",
    "Grenada", "Guatemala", "Guinea", "Guinea-Bissau", "Guyana",
    "Haiti", "Honduras", "Hungary", "Iceland", "India",
    "Indonesia", "Iran", "Iraq", "Ireland", "Israel",
    "Italy", "Ivory Coast", "Jamaica", "Japan", "Jordan",
    "Kazakhstan", "Kenya", "Kiribati", "Kosovo", "Kuwait",
    "Kyrgyzstan", "Laos", "Latvia", "Lebanon", "Lesotho",
    "Liberia", "Libya", "Liechtenstein", "Lithuania", "Luxembourg",
    "Madagascar", "Malawi", "Malaysia", "Maldives", "Mali",
    "Malta", "Marshall Islands", "Mauritania", "Mauritius", "Mexico",
    "Micronesia", "Moldova", "Monaco", "Mongolia", "Montenegro",
    "Morocco", "Mozambique", "Myanmar", "Namibia", "Nauru",
    "Nepal", "Netherlands", "New Zealand", "Nicaragua", "Niger",
    "Nigeria", "North Korea", "North Macedonia", "Norway", "Oman",
    "Pakistan", "Palau", "Palestine", "Panama", "Papua New Guinea",
    "Paraguay", "Peru", "Philippines", "Poland", "Portugal",
    "Qatar", "Republic of the Congo", "Romania", "Russia", "Rwanda",
    "Saint Kitts and Nevis", "Saint Lucia", "Saint Vincent and the Grenadines", "Samoa", "San Marino",
    "São Tomé and Príncipe", "Saudi Arabia", "Senegal", "Serbia", "Seychelles",
    "Sierra Leone", "Singapore", "Slovakia", "Slovenia", "Solomon Islands",
    "Somalia", "South Africa", "South Korea", "South Sudan", "Spain",
    "Sri Lanka", "Sudan", "Suriname", "Sweden", "Switzerland",
    "Syria", "Taiwan", "Tajikistan", "Tanzania", "Thailand",
    "Timor-Leste", "Togo", "Tonga", "Trinidad and Tobago", "Tunisia",
    "Turkey", "Turkmenistan", "Tuvalu", "Uganda", "Ukraine",
    "United Arab Emirates", "United Kingdom", "United States", "Uruguay", "Uzbekistan",
    "Vanuatu", "Vatican City", "Venezuela", "Vietnam", "Yemen",
    "Zambia", "Zimbabwe",
];

/// Common alternative spellings, lowercase, mapped to a canonical name
static ALIASES: &[(&str, &str)] = &[
    ("usa", "United States"),
    ("us", "United States"),
    ("united states of america", "United States"),
    ("america", "United States"),
    ("uk", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("uae", "United Arab Emirates"),
    ("czech republic", "Czechia"),
    ("holland", "Netherlands"),
    ("burma", "Myanmar"),
    ("swaziland", "Eswatini"),
    ("east timor", "Timor-Leste"),
    ("cote d'ivoire", "Ivory Coast"),
    ("côte d'ivoire", "Ivory Coast"),
    ("cabo verde", "Cape Verde"),
    ("macedonia", "North Macedonia"),
    ("democratic republic of the congo", "DR Congo"),
    ("drc", "DR Congo"),
    ("vatican", "Vatican City"),
    ("türkiye", "Turkey"),
    ("turkiye", "Turkey"),
    ("korea", "South Korea"),
    ("brasil", "Brazil"),
];

/// All canonical country names, in display order
pub fn country_names() -> &'static [&'static str] {
    COUNTRY_NAMES
}

/// Canonical country name that `text` resembles, if any
///
/// Exact (case-insensitive) names and aliases win; otherwise the closest
/// name within the edit-distance budget is returned. The budget follows the
/// shorter of `text` and the name, so short words never reach a country.
pub fn match_country(text: &str) -> Option<&'static str> {
    let wanted = normalize(text);
    if wanted.is_empty() {
        return None;
    }
    let wanted_len = wanted.chars().count();

    if let Some(name) = COUNTRY_NAMES.iter().find(|n| n.to_lowercase() == wanted) {
        return Some(*name);
    }
    if let Some((_, name)) = ALIASES.iter().find(|(alias, _)| *alias == wanted) {
        return Some(*name);
    }

    COUNTRY_NAMES
        .iter()
        .filter_map(|name| {
            let lower = name.to_lowercase();
            let budget = distance_budget(lower.chars().count().min(wanted_len));
            let distance = damerau_levenshtein(&wanted, &lower);
            (budget > 0 && distance <= budget).then_some((distance, *name))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name)
}

/// Allowed edit distance when the shorter side has `len` characters
fn distance_budget(len: usize) -> usize {
    match len {
        0..=6 => 0,
        7..=10 => 1,
        _ => 2,
    }
}

fn normalize(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    match collapsed.strip_prefix("the ") {
        Some(rest) => rest.to_string(),
        None => collapsed,
    }
}
