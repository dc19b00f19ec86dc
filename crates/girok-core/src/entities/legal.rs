//! Legal documents, consent taxonomy, and the law registry

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::uuid7;

/// Consent / document taxonomy shared by documents, laws and consents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentType {
    TermsOfService,
    PrivacyPolicy,
    DataProcessing,
    MarketingEmail,
    MarketingSms,
    MarketingPush,
    MarketingPushNight,
    CrossBorderTransfer,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::TermsOfService => "TERMS_OF_SERVICE",
            ConsentType::PrivacyPolicy => "PRIVACY_POLICY",
            ConsentType::DataProcessing => "DATA_PROCESSING",
            ConsentType::MarketingEmail => "MARKETING_EMAIL",
            ConsentType::MarketingSms => "MARKETING_SMS",
            ConsentType::MarketingPush => "MARKETING_PUSH",
            ConsentType::MarketingPushNight => "MARKETING_PUSH_NIGHT",
            ConsentType::CrossBorderTransfer => "CROSS_BORDER_TRANSFER",
        }
    }
}

impl std::fmt::Display for ConsentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned legal document
///
/// At most one latest active document exists per
/// `(doc_type, locale, service, country)` at any instant: the active,
/// unexpired row with the greatest `effective_date <= now`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalDocument {
    pub id: Uuid,
    pub doc_type: ConsentType,
    pub version: String,
    pub locale: String,
    pub service_id: Option<Uuid>,
    pub country: Option<String>,
    pub title: String,
    pub body: String,
    pub summary: Option<String>,
    pub effective_date: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl LegalDocument {
    /// Whether this document can currently be served as latest
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.effective_date <= now
            && self.expires_at.map(|exp| exp > now).unwrap_or(true)
    }
}

/// Special per-law rules beyond the consent lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialRules {
    /// Local-time window in which marketing pushes need the extra
    /// night-push consent, as "HH:MM" bounds
    pub night_push_start: Option<String>,
    pub night_push_end: Option<String>,
    pub data_retention_days: Option<u32>,
    pub min_age: Option<u8>,
    /// Guardian consent required below this age
    pub parental_consent_under: Option<u8>,
    /// Cross-border transfers need their own explicit consent
    #[serde(default)]
    pub cross_border_explicit: bool,
}

/// Consent requirements a law imposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LawRequirements {
    pub required: Vec<ConsentType>,
    pub optional: Vec<ConsentType>,
    #[serde(default)]
    pub special: SpecialRules,
}

/// A privacy law in the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Law {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub jurisdiction: String,
    pub country: Option<String>,
    pub effective_from: NaiveDate,
    pub is_active: bool,
    pub requirements: LawRequirements,
    pub created_at: DateTime<Utc>,
}

/// One entry of the merged per-country requirement set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequirement {
    pub consent_type: ConsentType,
    pub required: bool,
}

/// Merge requirements across laws, de-duplicated by consent type with
/// `required` winning on conflict
pub fn merge_requirements<'a, I>(laws: I) -> Vec<ConsentRequirement>
where
    I: IntoIterator<Item = &'a Law>,
{
    use std::collections::BTreeMap;

    let mut merged: BTreeMap<ConsentType, bool> = BTreeMap::new();
    for law in laws {
        for consent_type in &law.requirements.required {
            merged.insert(*consent_type, true);
        }
        for consent_type in &law.requirements.optional {
            merged.entry(*consent_type).or_insert(false);
        }
    }

    merged
        .into_iter()
        .map(|(consent_type, required)| ConsentRequirement {
            consent_type,
            required,
        })
        .collect()
}

/// The system laws seeded on first boot
pub fn builtin_laws() -> Vec<Law> {
    let now = Utc::now();
    let korea_marketing = vec![
        ConsentType::MarketingEmail,
        ConsentType::MarketingSms,
        ConsentType::MarketingPush,
        ConsentType::MarketingPushNight,
    ];

    vec![
        Law {
            id: uuid7::generate(),
            code: "PIPA".to_string(),
            name: "Personal Information Protection Act".to_string(),
            jurisdiction: "KR".to_string(),
            country: Some("KR".to_string()),
            effective_from: NaiveDate::from_ymd_opt(2011, 9, 30).unwrap_or_default(),
            is_active: true,
            requirements: LawRequirements {
                required: vec![ConsentType::TermsOfService, ConsentType::PrivacyPolicy],
                optional: korea_marketing,
                special: SpecialRules {
                    night_push_start: Some("21:00".to_string()),
                    night_push_end: Some("08:00".to_string()),
                    data_retention_days: Some(365),
                    min_age: Some(14),
                    parental_consent_under: Some(14),
                    cross_border_explicit: true,
                },
            },
            created_at: now,
        },
        Law {
            id: uuid7::generate(),
            code: "GDPR".to_string(),
            name: "General Data Protection Regulation".to_string(),
            jurisdiction: "EU".to_string(),
            country: None,
            effective_from: NaiveDate::from_ymd_opt(2018, 5, 25).unwrap_or_default(),
            is_active: true,
            requirements: LawRequirements {
                required: vec![
                    ConsentType::TermsOfService,
                    ConsentType::PrivacyPolicy,
                    ConsentType::DataProcessing,
                ],
                optional: vec![ConsentType::MarketingEmail, ConsentType::MarketingPush],
                special: SpecialRules {
                    min_age: Some(16),
                    parental_consent_under: Some(16),
                    cross_border_explicit: true,
                    ..SpecialRules::default()
                },
            },
            created_at: now,
        },
        Law {
            id: uuid7::generate(),
            code: "APPI".to_string(),
            name: "Act on the Protection of Personal Information".to_string(),
            jurisdiction: "JP".to_string(),
            country: Some("JP".to_string()),
            effective_from: NaiveDate::from_ymd_opt(2017, 5, 30).unwrap_or_default(),
            is_active: true,
            requirements: LawRequirements {
                required: vec![ConsentType::TermsOfService, ConsentType::PrivacyPolicy],
                optional: vec![ConsentType::MarketingEmail, ConsentType::MarketingPush],
                special: SpecialRules {
                    cross_border_explicit: true,
                    ..SpecialRules::default()
                },
            },
            created_at: now,
        },
        Law {
            id: uuid7::generate(),
            code: "CCPA".to_string(),
            name: "California Consumer Privacy Act".to_string(),
            jurisdiction: "US-CA".to_string(),
            country: Some("US".to_string()),
            effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            is_active: true,
            requirements: LawRequirements {
                required: vec![ConsentType::TermsOfService, ConsentType::PrivacyPolicy],
                optional: vec![
                    ConsentType::MarketingEmail,
                    ConsentType::MarketingSms,
                    ConsentType::MarketingPush,
                ],
                special: SpecialRules {
                    min_age: Some(13),
                    parental_consent_under: Some(13),
                    ..SpecialRules::default()
                },
            },
            created_at: now,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_document_effectiveness() {
        let now = Utc::now();
        let mut doc = LegalDocument {
            id: Uuid::new_v4(),
            doc_type: ConsentType::TermsOfService,
            version: "1.0".to_string(),
            locale: "en".to_string(),
            service_id: None,
            country: None,
            title: "Terms".to_string(),
            body: "...".to_string(),
            summary: None,
            effective_date: now - Duration::days(1),
            expires_at: None,
            is_active: true,
            created_at: now,
        };

        assert!(doc.is_effective(now));

        doc.is_active = false;
        assert!(!doc.is_effective(now));

        doc.is_active = true;
        doc.effective_date = now + Duration::days(1);
        assert!(!doc.is_effective(now));

        doc.effective_date = now - Duration::days(1);
        doc.expires_at = Some(now - Duration::hours(1));
        assert!(!doc.is_effective(now));
    }

    #[test]
    fn test_builtin_laws_cover_required_jurisdictions() {
        let laws = builtin_laws();
        let codes: Vec<&str> = laws.iter().map(|l| l.code.as_str()).collect();

        assert!(codes.contains(&"PIPA"));
        assert!(codes.contains(&"GDPR"));
        assert!(codes.contains(&"APPI"));
        assert!(codes.contains(&"CCPA"));
    }

    #[test]
    fn test_korean_requirements() {
        let laws = builtin_laws();
        let pipa = laws.iter().find(|l| l.code == "PIPA").unwrap();

        let merged = merge_requirements(std::iter::once(pipa));
        let required: Vec<ConsentType> = merged
            .iter()
            .filter(|r| r.required)
            .map(|r| r.consent_type)
            .collect();
        let optional: Vec<ConsentType> = merged
            .iter()
            .filter(|r| !r.required)
            .map(|r| r.consent_type)
            .collect();

        assert!(required.contains(&ConsentType::TermsOfService));
        assert!(required.contains(&ConsentType::PrivacyPolicy));
        assert!(optional.contains(&ConsentType::MarketingEmail));
        assert!(optional.contains(&ConsentType::MarketingSms));
        assert!(optional.contains(&ConsentType::MarketingPush));
        assert!(optional.contains(&ConsentType::MarketingPushNight));
    }

    #[test]
    fn test_merge_required_wins_on_conflict() {
        let mut a = builtin_laws().remove(0);
        a.requirements = LawRequirements {
            required: vec![ConsentType::MarketingEmail],
            optional: vec![],
            special: SpecialRules::default(),
        };
        let mut b = builtin_laws().remove(0);
        b.requirements = LawRequirements {
            required: vec![],
            optional: vec![ConsentType::MarketingEmail],
            special: SpecialRules::default(),
        };

        let merged = merge_requirements(vec![&b, &a]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].required);
    }

    #[test]
    fn test_consent_type_tokens() {
        assert_eq!(ConsentType::TermsOfService.as_str(), "TERMS_OF_SERVICE");
        assert_eq!(
            serde_json::to_string(&ConsentType::MarketingPushNight).unwrap(),
            "\"MARKETING_PUSH_NIGHT\""
        );
    }
}
