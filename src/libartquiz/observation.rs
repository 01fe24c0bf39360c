/// License codes whose photos may be shown in the quiz.
pub const ALLOWED_LICENSES: [&str; 5] = ["cc0", "cc-by", "cc-by-sa", "cc-by-nc", "cc-by-nc-sa"];

/// A missing code means "all rights reserved".
pub fn is_allowed_license(code: Option<&str>) -> bool {
    code.map(str::trim).is_some_and(|code| {
        ALLOWED_LICENSES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(code))
    })
}

/// The API hands out thumbnail URLs; the quiz wants the medium rendition.
pub fn medium_photo_url(url: &str) -> String {
    url.replacen("/square.", "/medium.", 1)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub text: Option<String>,
    pub observer: Option<String>,
}

/// A licensed, photographed sighting. Built once by a data source; the only
/// later change is enrichment, which yields a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    id: u64,
    photo_url: String,
    scientific_name: String,
    common_name: Option<String>,
    genus: Option<String>,
    family: Option<String>,
    broad_group: Option<String>,
    taxon_id: Option<u64>,
    license_code: String,
    attribution: Attribution,
}

impl Observation {
    pub fn new(
        id: u64,
        scientific_name: impl Into<String>,
        photo_url: impl Into<String>,
        license_code: impl Into<String>,
    ) -> Self {
        let scientific_name = scientific_name.into().trim().to_string();
        let genus = scientific_name
            .split_whitespace()
            .next()
            .map(str::to_string);
        Self {
            id,
            photo_url: photo_url.into(),
            scientific_name,
            common_name: None,
            genus,
            family: None,
            broad_group: None,
            taxon_id: None,
            license_code: license_code.into().to_ascii_lowercase(),
            attribution: Attribution::default(),
        }
    }

    pub fn with_common_name(mut self, common_name: Option<String>) -> Self {
        self.common_name = non_blank(common_name);
        self
    }
    pub fn with_taxon_id(mut self, taxon_id: Option<u64>) -> Self {
        self.taxon_id = taxon_id;
        self
    }
    pub fn with_family(mut self, family: Option<String>) -> Self {
        self.family = non_blank(family);
        self
    }
    pub fn with_broad_group(mut self, broad_group: Option<String>) -> Self {
        self.broad_group = non_blank(broad_group);
        self
    }
    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    /// Fills in family and broad group where they are still unknown. Values
    /// already present win over looked-up ones.
    pub fn with_taxonomy(self, family: Option<&str>, broad_group: Option<&str>) -> Self {
        let family = self.family.clone().or_else(|| family.map(str::to_string));
        let broad_group = self
            .broad_group
            .clone()
            .or_else(|| broad_group.map(str::to_string));
        self.with_family(family).with_broad_group(broad_group)
    }

    pub fn needs_taxonomy(&self) -> bool {
        self.family.is_none() || self.broad_group.is_none()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn photo_url(&self) -> &str {
        &self.photo_url
    }
    pub fn scientific_name(&self) -> &str {
        &self.scientific_name
    }
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }
    pub fn genus(&self) -> Option<&str> {
        self.genus.as_deref()
    }
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }
    pub fn broad_group(&self) -> Option<&str> {
        self.broad_group.as_deref()
    }
    pub fn taxon_id(&self) -> Option<u64> {
        self.taxon_id
    }
    pub fn license_code(&self) -> &str {
        &self.license_code
    }
    pub fn attribution(&self) -> &Attribution {
        &self.attribution
    }
}
