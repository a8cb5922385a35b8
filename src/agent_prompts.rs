//! Prompt text for the planner and composer models.
//!
//! Nothing here is enforced: the safety gate is the only authority on what
//! may run. Domain hints in particular are guidance for the planner.

use crate::intent::ErrorRecord;
use crate::security::GuardPolicy;

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a data assistant specialised in Brazilian tax data.
Turn questions about companies and tax benefits into ONE read-only SQL query for PostgreSQL.

Hard rules:
- Reply with a single JSON object and nothing else.
- Only SELECT or WITH queries. Never modify data.
- Use ONLY these tables of schema {schema}: {tables}.
- Never reference system catalogs (pg_*, information_schema).
- Use named parameters written as :name and list their values under "parameters".
- Select plain columns or simple expressions; avoid commas inside select expressions.
- Limit results to at most {limit} rows (use LIMIT).
- Order results in a meaningful way (largest benefit first, alphabetical, ...).
- If the question can not be answered with these tables, return "sql": "" and explain in "rationale".

Schema:

Table empresa
  - id (bigserial, PK), cnpj (varchar, unique)
  - razao_social, nome_fantasia, data_fundacao, capital_social
  - natureza_juridica_id/descricao, porte_id/descricao
  - situacao_cadastral_id/descricao, data_situacao_cadastral
  - matriz (bool), jurisdicao (varchar), simei_optante (bool), simples_optante (bool)
  - logradouro, numero, complemento, bairro, cidade, uf, cep, codigo_municipio
  - codigo_pais, nome_pais, telefones (jsonb), emails (jsonb)

Table beneficio_empresa
  - id (serial, PK), empresa_id (FK -> empresa.id)
  - periodo_apuracao (int, year or YYYYMM), uf (char(2))
  - dados (jsonb): keys such as "ben 89" hold the benefit amount

Table beneficios
  - codigo_beneficio (varchar, PK) e.g. "ben 89", descricao (text)

Table empresa_atividade
  - id (serial), empresa_id (FK), codigo_cnae (int), descricao_cnae (text), is_principal (bool)

Table empresa_socio
  - id (serial), empresa_id (FK), nome_socio, tipo_pessoa, documento_socio
  - data_entrada, descricao_qualificacao, faixa_etaria
  - representante_nome, representante_documento, representante_qualificacao_texto

Specific rules:
- Read a benefit amount with beneficio_empresa.dados ->> 'ben 89'.
- Join descriptions with JOIN beneficios b ON b.codigo_beneficio = 'ben 89' when useful.

Required JSON format:
{
  "sql": "SELECT ...",
  "parameters": { "name": "value" },
  "rationale": "short reasoning",
  "confidence": 0.0
}
Use null when a field does not apply."#;

pub const COMPOSER_SYSTEM_PROMPT: &str = r#"You are a tax analyst writing clear executive answers.
You receive the user's question, the SQL that was executed with its parameters, the returned rows and
a list of advisories about automatic adjustments.

Tasks:
1. Summarise the main findings in at most two short paragraphs.
2. Highlight relevant numbers (benefit amounts, company counts) in plain text.
3. If there are no rows, explain the likely reason and suggest a next step (another period or state).
4. Mention benefit codes and descriptions when they appear.
5. Never invent data; use only the rows provided.

Answer in the language of the question, as running text. Avoid numbered lists unless a ranking was asked for."#;

/// Keyword -> sector hints. Matched as lowercase substrings of the question
/// and appended to the planner prompt; never checked by the safety gate.
const DOMAIN_HINTS: &[(&str, &str)] = &[
    ("agro", "agribusiness: filter empresa_atividade.descricao_cnae ILIKE '%agric%' or '%pecu%'"),
    ("agricult", "agribusiness: filter empresa_atividade.descricao_cnae ILIKE '%agric%'"),
    ("industri", "industry: filter empresa_atividade.descricao_cnae ILIKE '%fabrica%'"),
    ("comércio", "retail/wholesale: filter empresa_atividade.descricao_cnae ILIKE '%comércio%'"),
    ("comercio", "retail/wholesale: filter empresa_atividade.descricao_cnae ILIKE '%comércio%'"),
    ("transport", "logistics: filter empresa_atividade.descricao_cnae ILIKE '%transporte%'"),
    ("tecnologia", "technology: filter empresa_atividade.descricao_cnae ILIKE '%software%' or '%informação%'"),
    ("energia", "energy: filter empresa_atividade.descricao_cnae ILIKE '%energia%'"),
];

pub fn planner_system_prompt(policy: &GuardPolicy, default_limit: usize) -> String {
    let tables: Vec<&str> = policy.allowed_tables().iter().map(String::as_str).collect();
    PLANNER_SYSTEM_PROMPT
        .replace("{schema}", policy.permitted_schema())
        .replace("{tables}", &tables.join(", "))
        .replace("{limit}", &default_limit.to_string())
}

pub fn domain_hints(question: &str) -> Vec<&'static str> {
    let lowered = question.to_lowercase();
    let mut hints: Vec<&'static str> = Vec::new();
    for (keyword, hint) in DOMAIN_HINTS {
        if lowered.contains(keyword) && !hints.contains(hint) {
            hints.push(hint);
        }
    }
    hints
}

/// User message for one planner call. Earlier failures are listed oldest to
/// newest so the most recent one sits right before the instruction to fix it.
pub fn planner_user_message(question: &str, history: &[ErrorRecord]) -> String {
    let mut parts = vec![format!("QUESTION: {}", question)];

    let hints = domain_hints(question);
    if !hints.is_empty() {
        parts.push("\nHints (optional):".to_string());
        parts.extend(hints.iter().map(|h| format!("- {}", h)));
    }

    if !history.is_empty() {
        parts.push("\nYour previous queries for this question failed in the database:".to_string());
        for record in history {
            parts.push(format!("- attempt {}: {}", record.attempt_index, record.message));
        }
        parts.push("Fix the most recent error and return a corrected JSON object.".to_string());
    }

    parts.join("\n")
}
