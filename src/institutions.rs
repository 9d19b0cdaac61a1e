//! Institution table and prompt templates.
//!
//! An institution is a tenant-like configuration unit selecting which
//! organization's knowledge, branding and allowed reference domain apply to
//! a request. Immutable after load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionConfig {
    pub name: String,
    pub short_name: String,
    pub role: String,
    pub website: String,
    pub admissions_url: String,
    pub programs_url: String,
    pub prompt_template: String,
}

#[derive(Debug, Deserialize)]
struct InstitutionsFile {
    default_institution_id: Option<String>,
    institutions: BTreeMap<String, InstitutionConfig>,
    #[serde(default)]
    prompt_templates: BTreeMap<String, String>,
}

pub struct InstitutionManager {
    default_id: String,
    institutions: BTreeMap<String, InstitutionConfig>,
    templates: BTreeMap<String, String>,
}

const STANDARD_TEMPLATE: &str = r#"You are a **{{ROLE}}** for **{{INSTITUTION_NAME}} ({{INSTITUTION_SHORT_NAME}})**, guiding students on career opportunities and academic programs.

## Scope of Knowledge:
- You can ONLY answer questions related to {{INSTITUTION_SHORT_NAME}} and general education topics
- For questions outside this scope, politely explain your limitations

## Query Handling Rules:
1. Use the student's personal information to provide highly tailored advice
2. Consider their program, semester, and interests when applicable
3. Answer only {{INSTITUTION_SHORT_NAME}}-related queries or general education topics
4. Provide professional, student-friendly responses
5. Format your response with clear sections and bullet points

## Response Format:
- Begin with a personalized greeting if name is provided
- Provide a brief introduction to the topic
- Present information in bullet points, tailored to their situation
- Include specific details from the retrieved information
- End with a friendly, conversational closing like "I hope this helps! Feel free to ask if you have any other questions about {{INSTITUTION_SHORT_NAME}}."
- DO NOT include any signature line, name, or title after your closing statement

## References Handling:
- ONLY use reference links that STRICTLY belong to the {{INSTITUTION_SHORT_NAME}} official domain ({{WEBSITE}})
- DO NOT include ANY external websites or sources, even if they appear in the retrieved content
- DO NOT create or invent any reference links that are not in the retrieved content
- Useful starting points: admissions at {{ADMISSIONS_URL}}, programs at {{PROGRAMS_URL}}
"#;

impl InstitutionManager {
    /// Built-in institution table matching the default deployment.
    pub fn builtin(default_id: Option<String>) -> Self {
        let mut institutions = BTreeMap::new();
        institutions.insert(
            "lpu".to_string(),
            InstitutionConfig {
                name: "Lovely Professional University".to_string(),
                short_name: "LPU".to_string(),
                role: "Career Counselor".to_string(),
                website: "https://www.lpu.in".to_string(),
                admissions_url: "https://www.lpu.in/admission/".to_string(),
                programs_url: "https://www.lpu.in/programs/".to_string(),
                prompt_template: "standard_template".to_string(),
            },
        );
        institutions.insert(
            "amity".to_string(),
            InstitutionConfig {
                name: "Amity University".to_string(),
                short_name: "AU".to_string(),
                role: "Academic Advisor".to_string(),
                website: "https://www.amity.edu".to_string(),
                admissions_url: "https://www.amity.edu/admission/".to_string(),
                programs_url: "https://www.amity.edu/programs/".to_string(),
                prompt_template: "standard_template".to_string(),
            },
        );

        let mut templates = BTreeMap::new();
        templates.insert("standard_template".to_string(), STANDARD_TEMPLATE.to_string());

        Self {
            default_id: default_id.unwrap_or_else(|| "lpu".to_string()),
            institutions,
            templates,
        }
    }

    /// Loads the table from a YAML file, falling back to the built-in
    /// standard template for ids the file does not define.
    pub fn from_yaml_file(path: &Path, default_id: Option<String>) -> Result<Self, ApiError> {
        let contents = std::fs::read_to_string(path).map_err(ApiError::internal)?;
        let file: InstitutionsFile = serde_yaml::from_str(&contents)
            .map_err(|e| ApiError::BadRequest(format!("Invalid institutions file: {}", e)))?;

        if file.institutions.is_empty() {
            return Err(ApiError::BadRequest(
                "Institutions file defines no institutions".to_string(),
            ));
        }

        let mut templates = file.prompt_templates;
        templates
            .entry("standard_template".to_string())
            .or_insert_with(|| STANDARD_TEMPLATE.to_string());

        let default_id = default_id
            .or(file.default_institution_id)
            .unwrap_or_else(|| file.institutions.keys().next().cloned().unwrap_or_default());

        Ok(Self {
            default_id,
            institutions: file.institutions,
            templates,
        })
    }

    /// Resolves an institution by id, falling back to the default when the
    /// id is absent or unknown.
    pub fn get(&self, institution_id: Option<&str>) -> &InstitutionConfig {
        institution_id
            .and_then(|id| self.institutions.get(id))
            .or_else(|| self.institutions.get(&self.default_id))
            .or_else(|| self.institutions.values().next())
            .expect("institution table is never empty")
    }

    /// The institution's prompt template with all placeholders substituted.
    pub fn processed_prompt(&self, institution_id: Option<&str>) -> String {
        let institution = self.get(institution_id);
        let template = self
            .templates
            .get(&institution.prompt_template)
            .map(String::as_str)
            .unwrap_or(STANDARD_TEMPLATE);

        template
            .replace("{{ROLE}}", &institution.role)
            .replace("{{INSTITUTION_NAME}}", &institution.name)
            .replace("{{INSTITUTION_SHORT_NAME}}", &institution.short_name)
            .replace("{{WEBSITE}}", &institution.website)
            .replace("{{ADMISSIONS_URL}}", &institution.admissions_url)
            .replace("{{PROGRAMS_URL}}", &institution.programs_url)
    }

    /// The domain references must belong to, derived from the institution's
    /// website (scheme and leading `www.` stripped).
    pub fn allowed_domain(&self, institution: &InstitutionConfig) -> String {
        let website = institution
            .website
            .strip_prefix("https://")
            .or_else(|| institution.website.strip_prefix("http://"))
            .unwrap_or(&institution.website);
        let host = website.split(['/', '?', '#']).next().unwrap_or(website);
        host.strip_prefix("www.").unwrap_or(host).to_lowercase()
    }

    pub fn list(&self) -> Vec<(&str, &str)> {
        self.institutions
            .iter()
            .map(|(id, config)| (id.as_str(), config.name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_falls_back_to_the_default_institution() {
        let manager = InstitutionManager::builtin(None);
        assert_eq!(manager.get(Some("nowhere")).short_name, "LPU");
        assert_eq!(manager.get(None).short_name, "LPU");
        assert_eq!(manager.get(Some("amity")).short_name, "AU");
    }

    #[test]
    fn processed_prompt_substitutes_all_placeholders() {
        let manager = InstitutionManager::builtin(None);
        let prompt = manager.processed_prompt(Some("amity"));
        assert!(prompt.contains("Academic Advisor"));
        assert!(prompt.contains("Amity University"));
        assert!(prompt.contains("https://www.amity.edu"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn allowed_domain_strips_scheme_and_www() {
        let manager = InstitutionManager::builtin(None);
        let lpu = manager.get(Some("lpu")).clone();
        assert_eq!(manager.allowed_domain(&lpu), "lpu.in");
    }

    #[test]
    fn yaml_file_overrides_the_builtin_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("institutions.yml");
        std::fs::write(
            &path,
            r#"
default_institution_id: tech
institutions:
  tech:
    name: Tech Institute
    short_name: TI
    role: Advisor
    website: https://tech.example.edu
    admissions_url: https://tech.example.edu/apply/
    programs_url: https://tech.example.edu/programs/
    prompt_template: standard_template
"#,
        )
        .unwrap();

        let manager = InstitutionManager::from_yaml_file(&path, None).unwrap();
        assert_eq!(manager.get(None).short_name, "TI");
        let tech = manager.get(Some("tech")).clone();
        assert_eq!(manager.allowed_domain(&tech), "tech.example.edu");
        assert!(manager.processed_prompt(Some("tech")).contains("Tech Institute"));
    }
}
