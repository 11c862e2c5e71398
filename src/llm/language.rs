//! Lightweight Portuguese detection for model answers.

/// Common Portuguese words; matched as substrings of the lower-cased text.
const PORTUGUESE_WORDS: [&str; 40] = [
    "você", "não", "são", "está", "esse", "essa", "isso", "como", "para", "que", "uma", "seu",
    "sua", "mais", "também", "pode", "deve", "fazer", "dinheiro", "investimento", "financeiro",
    "renda", "conta", "banco", "quando", "porque", "então", "ainda", "pelo", "pela", "seus",
    "suas", "sobre", "após", "entre", "cada", "muito", "outro", "outra", "mesmo",
];

/// Matches needed before a text counts as Portuguese.
const MIN_MATCHES: usize = 3;

/// Whether `text` already reads as Portuguese.
#[must_use]
pub fn is_portuguese(text: &str) -> bool {
    let lower = text.to_lowercase();
    PORTUGUESE_WORDS
        .iter()
        .filter(|word| lower.contains(*word))
        .take(MIN_MATCHES)
        .count()
        >= MIN_MATCHES
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn portuguese_answer_is_detected() {
        assert!(is_portuguese(
            "Você pode separar uma parte da sua renda para investimento todo mês."
        ));
    }

    #[test]
    fn english_answer_is_not_detected() {
        assert!(!is_portuguese(
            "You should set aside part of your income every month."
        ));
    }

    #[test]
    fn matching_ignores_case() {
        assert!(is_portuguese("VOCÊ NÃO ESTÁ SOZINHO"));
    }

    #[test]
    fn two_matches_are_not_enough() {
        assert!(!is_portuguese("banco e renda"));
    }
}
