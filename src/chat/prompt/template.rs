//! System prompt template parameterized by the user's classification and income.

use crate::chat::core::user_profile::{ProfileType, User};

/// Placeholder replaced by the profile description.
pub const PROFILE_PLACEHOLDER: &str = "{profile_description}";
/// Placeholder replaced by the language style instruction.
pub const STYLE_PLACEHOLDER: &str = "{language_style}";
/// Placeholder replaced by the `pt-BR` formatted income.
pub const INCOME_PLACEHOLDER: &str = "{income}";

const FINANCE_TEMPLATE: &str = "Você é um assistente financeiro especializado em educação financeira para brasileiros.

CONTEXTO DO USUÁRIO:
- Perfil financeiro: {profile_description}
- Renda mensal: R$ {income}

INSTRUÇÕES:
1. Responda APENAS a pergunta atual do usuário
2. Use linguagem {language_style}
3. Dê exemplos práticos relacionados à realidade brasileira
4. Seja objetivo e direto nas respostas
5. Não mencione conversas de outros usuários
6. Cada conversa é independente e isolada

IMPORTANTE: Você está respondendo apenas para este usuário específico. Ignore qualquer contexto de conversas anteriores que não esteja explicitamente incluído nas mensagens.";

/// Per-request user context for prompt rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UserContext {
    /// Classification.
    pub profile_type: ProfileType,
    /// Monthly income in BRL.
    pub income: f64,
}

impl From<&User> for UserContext {
    fn from(user: &User) -> Self {
        Self {
            profile_type: user.classification(),
            income: user.income,
        }
    }
}

/// Injected system prompt template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(FINANCE_TEMPLATE)
    }
}

impl PromptTemplate {
    /// Wrap a template string using the `{profile_description}`,
    /// `{language_style}` and `{income}` placeholders.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the system prompt for a user.
    #[must_use]
    pub fn render(&self, context: &UserContext) -> String {
        self.template
            .replace(PROFILE_PLACEHOLDER, profile_description(context.profile_type))
            .replace(STYLE_PLACEHOLDER, language_style(context.profile_type))
            .replace(INCOME_PLACEHOLDER, &format_income_pt_br(context.income))
    }
}

const fn profile_description(profile_type: ProfileType) -> &'static str {
    match profile_type {
        ProfileType::Advanced => "avançado (possui conhecimentos financeiros sólidos)",
        ProfileType::Basic => "básico (está aprendendo sobre finanças)",
    }
}

const fn language_style(profile_type: ProfileType) -> &'static str {
    match profile_type {
        ProfileType::Advanced => "técnica quando apropriado",
        ProfileType::Basic => "simples e didática",
    }
}

/// Format an amount with `pt-BR` grouping: `.` for thousands, `,` before up to
/// three fraction digits.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_income_pt_br(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let scaled = (amount.abs() * 1000.0).round() as u64;
    let whole = scaled / 1000;
    let fraction = scaled % 1000;

    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 5);
    if amount < 0.0 && scaled > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }

    if fraction > 0 {
        let fraction = format!("{fraction:03}");
        out.push(',');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn context(profile_type: ProfileType, income: f64) -> UserContext {
        UserContext {
            profile_type,
            income,
        }
    }

    #[test]
    fn income_uses_brazilian_grouping() {
        assert_eq!(format_income_pt_br(0.0), "0");
        assert_eq!(format_income_pt_br(950.0), "950");
        assert_eq!(format_income_pt_br(5000.0), "5.000");
        assert_eq!(format_income_pt_br(1_234_567.0), "1.234.567");
        assert_eq!(format_income_pt_br(1234.5), "1.234,5");
        assert_eq!(format_income_pt_br(0.1234), "0,123");
    }

    #[test]
    fn basic_profile_gets_didactic_wording() {
        let prompt = PromptTemplate::default().render(&context(ProfileType::Basic, 2500.0));
        assert!(prompt.contains("básico (está aprendendo sobre finanças)"));
        assert!(prompt.contains("simples e didática"));
        assert!(prompt.contains("R$ 2.500"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn advanced_profile_gets_technical_wording() {
        let prompt = PromptTemplate::default().render(&context(ProfileType::Advanced, 12000.0));
        assert!(prompt.contains("avançado"));
        assert!(prompt.contains("técnica quando apropriado"));
        assert!(prompt.contains("R$ 12.000"));
    }

    #[test]
    fn custom_template_is_honoured() {
        let template = PromptTemplate::new("perfil={profile_description}; renda={income}");
        let prompt = template.render(&context(ProfileType::Basic, 100.0));
        assert_eq!(prompt, "perfil=básico (está aprendendo sobre finanças); renda=100");
    }
}
