// src/models/survey.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::loyalty::Coupon;

// --- PERGUNTAS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Nps,
    Csat,
    Text,
    SingleChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[schema(example = "q1")]
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[schema(example = "De 0 a 10, quanto você nos recomendaria?")]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[schema(example = json!(["Almoço", "Jantar"]))]
    pub options: Option<Vec<String>>,
}

/// Regras do formulário: ao menos uma pergunta, ids únicos e não vazios,
/// no máximo uma pergunta NPS e uma CSAT, e escolha única com opções.
pub fn validate_questions(questions: &[Question]) -> Result<(), ValidationError> {
    if questions.is_empty() {
        return Err(ValidationError::new("questions_required"));
    }

    let mut seen = HashSet::new();
    for q in questions {
        if q.id.trim().is_empty() || q.label.trim().is_empty() {
            return Err(ValidationError::new("question_incomplete"));
        }
        if !seen.insert(q.id.as_str()) {
            return Err(ValidationError::new("duplicate_question_id"));
        }
        if q.question_type == QuestionType::SingleChoice
            && q.options.as_ref().is_none_or(|opts| opts.is_empty())
        {
            return Err(ValidationError::new("options_required"));
        }
    }

    for kind in [QuestionType::Nps, QuestionType::Csat] {
        if questions.iter().filter(|q| q.question_type == kind).count() > 1 {
            return Err(ValidationError::new("single_score_question"));
        }
    }

    Ok(())
}

/// Notas extraídas das respostas validadas.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractedScores {
    pub nps: Option<i16>,
    pub csat: Option<i16>,
}

/// Confere cada resposta contra a sua pergunta. Retorna as notas de NPS/CSAT
/// ou o mapa `id da pergunta -> código do erro`.
pub fn validate_answers(
    questions: &[Question],
    answers: &HashMap<String, Value>,
) -> Result<ExtractedScores, HashMap<String, String>> {
    let mut errors = HashMap::new();
    let mut scores = ExtractedScores::default();

    for key in answers.keys() {
        if !questions.iter().any(|q| &q.id == key) {
            errors.insert(key.clone(), "unknown_question".to_string());
        }
    }

    for q in questions {
        let value = answers.get(&q.id).filter(|v| !v.is_null());

        let Some(value) = value else {
            if q.required {
                errors.insert(q.id.clone(), "required".to_string());
            }
            continue;
        };

        let outcome = match q.question_type {
            QuestionType::Nps => score_in_range(value, 0, 10)
                .map(|n| scores.nps = Some(n))
                .ok_or("invalid_nps"),
            QuestionType::Csat => score_in_range(value, 1, 5)
                .map(|n| scores.csat = Some(n))
                .ok_or("invalid_csat"),
            QuestionType::Text => value.as_str().map(|_| ()).ok_or("invalid_text"),
            QuestionType::SingleChoice => {
                let options = q.options.as_deref().unwrap_or(&[]);
                value
                    .as_str()
                    .filter(|choice| options.iter().any(|o| o == choice))
                    .map(|_| ())
                    .ok_or("invalid_option")
            }
        };

        if let Err(code) = outcome {
            errors.insert(q.id.clone(), code.to_string());
        }
    }

    if errors.is_empty() {
        Ok(scores)
    } else {
        Err(errors)
    }
}

fn score_in_range(value: &Value, min: i64, max: i64) -> Option<i16> {
    value
        .as_i64()
        .filter(|n| (min..=max).contains(n))
        .map(|n| n as i16)
}

// --- PESQUISA ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Pesquisa de satisfação - Salão")]
    pub title: String,
    pub description: Option<String>,
    #[schema(value_type = Vec<Question>)]
    pub questions: Json<Vec<Question>>,
    pub reward_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// O que o cliente final enxerga (sem dados internos da loja)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicSurvey {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<Question>,
    pub has_reward: bool,
}

impl From<Survey> for PublicSurvey {
    fn from(survey: Survey) -> Self {
        Self {
            id: survey.id,
            title: survey.title,
            description: survey.description,
            questions: survey.questions.0,
            has_reward: survey.reward_id.is_some(),
        }
    }
}

// --- RESPOSTAS ---

// Resposta com os nomes já resolvidos (join) para a listagem
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub survey_id: Uuid,
    pub survey_title: String,
    pub client_id: Option<Uuid>,
    pub client_name: Option<String>,
    pub attendant_id: Option<Uuid>,
    pub attendant_name: Option<String>,
    #[schema(value_type = Object, example = json!({"q1": 9, "q2": "Ótimo atendimento"}))]
    pub answers: Value,
    pub nps_score: Option<i16>,
    pub csat_score: Option<i16>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondentPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    #[validate(length(min = 8, max = 20, message = "invalid_phone"))]
    #[schema(example = "+5511988887777")]
    pub phone: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponsePayload {
    #[schema(value_type = Object, example = json!({"q1": 10, "q2": "Jantar"}))]
    pub answers: HashMap<String, Value>,

    #[validate(nested)]
    pub client: Option<RespondentPayload>,

    pub attendant_id: Option<Uuid>,

    #[validate(length(max = 2000, message = "too_long"))]
    pub comment: Option<String>,
}

// Filtros da listagem de respostas (query string)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ResponseFilter {
    pub survey_id: Option<Uuid>,
    pub attendant_id: Option<Uuid>,
    /// Data inicial (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Data final (inclusive)
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// Comprovante devolvido ao cliente final
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub response_id: Uuid,
    pub coupon: Option<Coupon>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: QuestionType, required: bool) -> Question {
        Question {
            id: id.to_string(),
            question_type: kind,
            label: format!("Pergunta {id}"),
            required,
            options: (kind == QuestionType::SingleChoice)
                .then(|| vec!["Almoço".to_string(), "Jantar".to_string()]),
        }
    }

    fn form() -> Vec<Question> {
        vec![
            question("nps", QuestionType::Nps, true),
            question("csat", QuestionType::Csat, false),
            question("turno", QuestionType::SingleChoice, false),
            question("obs", QuestionType::Text, false),
        ]
    }

    fn answers(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn question_type_uses_type_field_on_the_wire() {
        let q: Question =
            serde_json::from_value(json!({"id": "q1", "type": "single_choice", "label": "Turno", "options": ["A"]}))
                .unwrap();
        assert_eq!(q.question_type, QuestionType::SingleChoice);
        assert!(!q.required);
    }

    #[test]
    fn form_rules() {
        assert!(validate_questions(&form()).is_ok());
        assert!(validate_questions(&[]).is_err());

        let dup = vec![question("a", QuestionType::Text, false), question("a", QuestionType::Nps, true)];
        assert_eq!(validate_questions(&dup).unwrap_err().code, "duplicate_question_id");

        let two_nps = vec![question("a", QuestionType::Nps, true), question("b", QuestionType::Nps, true)];
        assert_eq!(validate_questions(&two_nps).unwrap_err().code, "single_score_question");

        let mut no_options = question("c", QuestionType::SingleChoice, false);
        no_options.options = Some(vec![]);
        assert_eq!(validate_questions(&[no_options]).unwrap_err().code, "options_required");
    }

    #[test]
    fn valid_answers_yield_scores() {
        let scores = validate_answers(
            &form(),
            &answers(&[("nps", json!(9)), ("csat", json!(4)), ("turno", json!("Jantar"))]),
        )
        .unwrap();

        assert_eq!(scores, ExtractedScores { nps: Some(9), csat: Some(4) });
    }

    #[test]
    fn missing_required_and_out_of_range_answers_are_reported() {
        let errors = validate_answers(&form(), &answers(&[("csat", json!(0))])).unwrap_err();
        assert_eq!(errors["nps"], "required");
        assert_eq!(errors["csat"], "invalid_csat");

        let errors = validate_answers(&form(), &answers(&[("nps", json!(11))])).unwrap_err();
        assert_eq!(errors["nps"], "invalid_nps");

        let errors = validate_answers(&form(), &answers(&[("nps", json!(7.5))])).unwrap_err();
        assert_eq!(errors["nps"], "invalid_nps");
    }

    #[test]
    fn choices_and_unknown_questions_are_checked() {
        let errors = validate_answers(
            &form(),
            &answers(&[("nps", json!(10)), ("turno", json!("Café")), ("extra", json!("x"))]),
        )
        .unwrap_err();

        assert_eq!(errors["turno"], "invalid_option");
        assert_eq!(errors["extra"], "unknown_question");
    }

    #[test]
    fn null_optional_answer_is_treated_as_absent() {
        let scores =
            validate_answers(&form(), &answers(&[("nps", json!(3)), ("obs", Value::Null)])).unwrap();
        assert_eq!(scores.nps, Some(3));
        assert_eq!(scores.csat, None);
    }
}
