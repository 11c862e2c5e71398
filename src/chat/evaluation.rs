//! Financial-level questionnaire and classification scoring.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::UserId;
use crate::chat::core::user_profile::ProfileType;
use crate::chat::users::user_store::UserDirectory;

/// Percentage at or above which a user is classified `advanced`.
pub const ADVANCED_THRESHOLD: f64 = 50.0;

/// Questions where "Não" is the positive answer.
pub const INVERTED_QUESTION_IDS: [u32; 1] = [13];

/// One questionnaire entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EvaluationQuestion {
    /// Stable question id.
    pub id: u32,
    /// Topic the question belongs to.
    pub dimension: &'static str,
    /// Question text.
    pub question: &'static str,
}

const PLANNING: &str = "Planejamento e Controle Financeiro";
const PRICING: &str = "Formação de Preço e Margem de Lucro";
const COSTS: &str = "Controle de Custos e Despesas";
const DEBT: &str = "Gestão do Endividamento e Crédito";
const PERSONAL: &str = "Finanças Pessoais x Empresariais";
const INVESTMENT: &str = "Investimento e Reinvestimento no Negócio";
const COMPLIANCE: &str = "Formalização e Conformidade";

const fn q(id: u32, dimension: &'static str, question: &'static str) -> EvaluationQuestion {
    EvaluationQuestion {
        id,
        dimension,
        question,
    }
}

/// The full questionnaire, ordered by id.
pub const EVALUATION_QUESTIONS: [EvaluationQuestion; 20] = [
    q(1, PLANNING, "Você anota todas as entradas e saídas do seu negócio?"),
    q(2, PLANNING, "Você sabe dizer qual é o saldo de caixa do seu negócio hoje?"),
    q(3, PLANNING, "Você faz planejamento do dinheiro do negócio para os próximos meses?"),
    q(4, PRICING, "Você sabe calcular quanto custa, de verdade, cada produto ou serviço que você vende?"),
    q(5, PRICING, "Quando define seus preços, você leva em conta custos, despesas e impostos?"),
    q(6, PRICING, "Você já calculou a margem de lucro de seus produtos/serviços?"),
    q(7, COSTS, "Você sabe quais são os principais custos fixos do seu negócio?"),
    q(8, COSTS, "Você registra e acompanha os gastos pequenos do dia a dia (como água, energia, transporte)?"),
    q(9, COSTS, "Você já tentou negociar melhores preços ou prazos com seus fornecedores?"),
    q(10, DEBT, "Você já usou empréstimos ou financiamentos para o negócio?"),
    q(11, DEBT, "Antes de pegar crédito, você calcula se conseguirá pagar as parcelas sem comprometer o caixa?"),
    q(12, DEBT, "Você conhece o significado da taxa de juros ou do custo total do crédito (CET)?"),
    q(13, PERSONAL, "Você mistura dinheiro do negócio com dinheiro pessoal?"),
    q(14, PERSONAL, "Você retira um valor fixo por mês do negócio para seu uso pessoal (pró-labore)?"),
    q(15, PERSONAL, "Você separa contas bancárias do negócio e pessoais?"),
    q(16, INVESTMENT, "Você já reinvestiu parte do lucro do negócio em melhorias (ex.: equipamentos, marketing, treinamento)?"),
    q(17, INVESTMENT, "Você analisa se esses investimentos trouxeram retorno?"),
    q(18, COMPLIANCE, "Seu negócio é formalizado (MEI, Simples Nacional, etc.)?"),
    q(19, COMPLIANCE, "Você emite nota fiscal quando vende produtos ou serviços?"),
    q(20, COMPLIANCE, "Você sabe quais são as obrigações de pagamento de impostos ou contribuições do seu negócio?"),
];

/// Allowed answer to a questionnaire entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerOption {
    /// Yes.
    #[serde(rename = "Sim")]
    Yes,
    /// No.
    #[serde(rename = "Não")]
    No,
    /// Don't know; excluded from scoring.
    #[serde(rename = "Não Sei")]
    DontKnow,
}

/// Answer options in display order.
pub const ANSWER_OPTIONS: [AnswerOption; 3] =
    [AnswerOption::Yes, AnswerOption::No, AnswerOption::DontKnow];

/// One submitted answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationAnswer {
    /// Answered question id.
    pub question_id: u32,
    /// Chosen option.
    pub answer: AnswerOption,
}

/// Score breakdown reported back to the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScore {
    /// Positive answers after inversion.
    pub sim_count: usize,
    /// Answers other than "Não Sei".
    pub total_answered: usize,
    /// Rounded positive percentage.
    pub percentage: u32,
}

/// Classification outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    /// Resulting classification.
    pub profile_type: ProfileType,
    /// How it was reached.
    pub score: EvaluationScore,
}

fn is_positive(answer: EvaluationAnswer) -> bool {
    if INVERTED_QUESTION_IDS.contains(&answer.question_id) {
        answer.answer == AnswerOption::No
    } else {
        answer.answer == AnswerOption::Yes
    }
}

/// Score a set of answers.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn evaluate(answers: &[EvaluationAnswer]) -> EvaluationOutcome {
    let valid: Vec<EvaluationAnswer> = answers
        .iter()
        .copied()
        .filter(|answer| answer.answer != AnswerOption::DontKnow)
        .collect();
    let sim_count = valid.iter().copied().filter(|&answer| is_positive(answer)).count();
    let total_answered = valid.len();

    let percentage = if total_answered == 0 {
        0.0
    } else {
        sim_count as f64 / total_answered as f64 * 100.0
    };
    let profile_type = if percentage >= ADVANCED_THRESHOLD {
        ProfileType::Advanced
    } else {
        ProfileType::Basic
    };

    EvaluationOutcome {
        profile_type,
        score: EvaluationScore {
            sim_count,
            total_answered,
            percentage: percentage.round() as u32,
        },
    }
}

/// Score the answers and store the resulting classification on the user.
///
/// # Errors
/// - [`ChatError::NotFound`] if the user does not exist.
/// - Any storage error.
pub async fn apply_evaluation(
    users: &dyn UserDirectory,
    user_id: &UserId,
    answers: &[EvaluationAnswer],
) -> ChatResult<EvaluationOutcome> {
    let outcome = evaluate(answers);
    if !users
        .update_profile_type(user_id, outcome.profile_type)
        .await?
    {
        return Err(ChatError::NotFound(user_id.clone()));
    }
    info!(
        %user_id,
        profile_type = %outcome.profile_type,
        percentage = outcome.score.percentage,
        "financial level evaluated"
    );
    Ok(outcome)
}
