use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket for historical records whose code has no mapping.
pub const OUTROS: &str = "Outros";

/// Stand-in for revenue rows exported without a resource source.
pub const UNCLASSIFIED_SOURCE: &str = "Não Classificado";

/// Classification dimensions of the ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    BudgetUnit,
    ResourceSource,
    ExpenseElement,
    RevenueDescription,
}

/// Exact-match map from a raw ledger code to its canonical category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable(BTreeMap<String, String>);

impl CategoryTable {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: Vec<(K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn from_static(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn get(&self, raw_code: &str) -> Option<&str> {
        self.0.get(raw_code).map(String::as_str)
    }

    /// Mapped category, or the raw code itself when unmapped.
    pub fn category_of<'a>(&'a self, raw_code: &'a str) -> &'a str {
        self.get(raw_code).unwrap_or(raw_code)
    }

    /// Mapped category, or `fallback` when unmapped.
    pub fn category_or<'a>(&'a self, raw_code: &str, fallback: &'a str) -> &'a str {
        self.get(raw_code).unwrap_or(fallback)
    }

    pub fn insert(&mut self, raw_code: &str, category: &str) {
        self.0.insert(raw_code.to_string(), category.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixEntry {
    pub prefix: String,
    pub label: String,
}

/// Ordered prefix map for noisy resource codes. Registration order breaks
/// ties: the first prefix that matches wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixTable(Vec<PrefixEntry>);

impl PrefixTable {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: Vec<(K, V)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(prefix, label)| PrefixEntry {
                    prefix: prefix.into(),
                    label: label.into(),
                })
                .collect(),
        )
    }

    pub fn lookup(&self, value: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|entry| value.starts_with(entry.prefix.as_str()))
            .map(|entry| entry.label.as_str())
    }

    /// Matched label, or the value unchanged.
    pub fn expand(&self, value: &str) -> String {
        self.lookup(value).unwrap_or(value).to_string()
    }

    pub fn entries(&self) -> &[PrefixEntry] {
        &self.0
    }
}

/// All lookup tables the aggregation layers read. Treated as read-only
/// configuration and passed in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTables {
    #[serde(default)]
    pub budget_unit: CategoryTable,
    #[serde(default)]
    pub resource_source: CategoryTable,
    #[serde(default)]
    pub expense_element: CategoryTable,
    #[serde(default)]
    pub revenue_description: CategoryTable,
    #[serde(default)]
    pub resource_prefixes: PrefixTable,
}

impl CategoryTables {
    pub fn empty() -> Self {
        Self {
            budget_unit: CategoryTable::default(),
            resource_source: CategoryTable::default(),
            expense_element: CategoryTable::default(),
            revenue_description: CategoryTable::default(),
            resource_prefixes: PrefixTable::default(),
        }
    }

    pub fn table(&self, dimension: Dimension) -> &CategoryTable {
        match dimension {
            Dimension::BudgetUnit => &self.budget_unit,
            Dimension::ResourceSource => &self.resource_source,
            Dimension::ExpenseElement => &self.expense_element,
            Dimension::RevenueDescription => &self.revenue_description,
        }
    }

    /// Display category for a dimension: mapped label or the raw code.
    pub fn categorize<'a>(&'a self, dimension: Dimension, raw_code: &'a str) -> &'a str {
        self.table(dimension).category_of(raw_code)
    }

    /// Grouping label for an optional code; rows missing the code are
    /// grouped under [`OUTROS`].
    pub fn display_category(&self, dimension: Dimension, raw_code: Option<&str>) -> String {
        raw_code
            .map_or(OUTROS, |code| self.categorize(dimension, code))
            .to_string()
    }

    /// Revenue sources also fall back to the prefix table before giving up
    /// and returning the raw code.
    pub fn categorize_revenue_source<'a>(&'a self, raw_code: &'a str) -> &'a str {
        self.resource_source
            .get(raw_code)
            .or_else(|| self.resource_prefixes.lookup(raw_code))
            .unwrap_or(raw_code)
    }
}

impl Default for CategoryTables {
    fn default() -> Self {
        Self {
            budget_unit: CategoryTable::from_static(BUDGET_UNITS),
            resource_source: CategoryTable::from_static(RESOURCE_SOURCES),
            expense_element: CategoryTable::from_static(EXPENSE_ELEMENTS),
            revenue_description: CategoryTable::from_static(REVENUE_DESCRIPTIONS),
            resource_prefixes: PrefixTable::from_pairs(RESOURCE_PREFIXES.to_vec()),
        }
    }
}

const BUDGET_UNITS: &[(&str, &str)] = &[
    ("Câmara Municipal", "Legislativo"),
    ("Gabinete do Prefeito", "Administração"),
    ("Secretaria Municipal de Administração", "Administração"),
    ("Secretaria Municipal de Finanças", "Administração"),
    ("Secretaria Municipal de Educação", "Educação"),
    ("Fundo Municipal de Educação", "Educação"),
    ("Secretaria Municipal de Saúde", "Saúde"),
    ("Fundo Municipal de Saúde", "Saúde"),
    ("Secretaria Municipal de Assistência Social", "Assistência Social"),
    ("Fundo Municipal de Assistência Social", "Assistência Social"),
    ("Secretaria Municipal de Obras e Serviços Urbanos", "Infraestrutura"),
    ("Secretaria Municipal de Agricultura", "Desenvolvimento Econômico"),
];

const RESOURCE_SOURCES: &[(&str, &str)] = &[
    ("1500", "Recursos Livres"),
    ("1501", "Recursos Livres"),
    ("1540", "FUNDEB"),
    ("1541", "FUNDEB"),
    ("1550", "Salário-Educação"),
    ("1600", "Saúde - SUS Federal"),
    ("1621", "Saúde - SUS Estadual"),
    ("1660", "Assistência Social"),
    ("1700", "Convênios"),
    ("1706", "Emendas Parlamentares"),
    ("1710", "Emendas Parlamentares"),
    ("1750", "Contribuição de Iluminação Pública"),
];

const EXPENSE_ELEMENTS: &[(&str, &str)] = &[
    ("3.1.90.04", "Pessoal"),
    ("3.1.90.11", "Pessoal"),
    ("3.1.90.13", "Pessoal"),
    ("3.1.90.16", "Pessoal"),
    ("3.1.91.13", "Pessoal"),
    ("3.3.90.14", "Custeio"),
    ("3.3.90.30", "Custeio"),
    ("3.3.90.46", "Custeio"),
    ("3.3.90.36", "Serviços de Terceiros"),
    ("3.3.90.39", "Serviços de Terceiros"),
    ("3.3.90.40", "Serviços de Terceiros"),
    ("3.3.90.48", "Assistência"),
    ("3.3.50.43", "Transferências"),
    ("3.3.71.70", "Transferências"),
    ("3.2.90.21", "Dívida"),
    ("4.6.90.71", "Dívida"),
    ("4.4.90.51", "Investimentos"),
    ("4.4.90.52", "Investimentos"),
];

const REVENUE_DESCRIPTIONS: &[(&str, &str)] = &[
    ("Imposto sobre a Propriedade Predial e Territorial Urbana", "Impostos"),
    ("Imposto sobre Serviços de Qualquer Natureza", "Impostos"),
    ("Imposto sobre a Renda - Retido na Fonte", "Impostos"),
    ("Imposto sobre Transmissão Inter Vivos de Bens Imóveis", "Impostos"),
    ("Cota-Parte do Fundo de Participação dos Municípios", "Transferências da União"),
    ("Cota-Parte do ICMS", "Transferências do Estado"),
    ("Cota-Parte do IPVA", "Transferências do Estado"),
    ("Transferências do FUNDEB", "FUNDEB"),
    ("Taxa de Coleta de Lixo", "Taxas"),
    ("Contribuição para o Custeio do Serviço de Iluminação Pública", "Contribuições"),
];

const RESOURCE_PREFIXES: &[(&str, &str)] = &[
    ("17090000000", "17090000000 - Transferência da União referente à Compensação Financeira de Recursos Hídricos"),
    ("17100003210", "17100003210 - Transferência Especial dos Estados - (Outros) - Emenda Parlamentar Individual"),
    ("17000003110", "17000003110 - Outras Transferências de Convênios ou Instrumentos Congêneres da União - (Outros) - Emenda Parlamentar Individual"),
    ("27100003210", "27100003210 - Transferência Especial dos Estados - (outros) - Emenda Parlamentar Individual"),
    ("16000003110", "16000003110 - Transf. Fundo a Fundo de Rec. do SUS prov. do Governo Federal - Bloco de Manut. das Ações e Serviços Públicos de Saúde - Emenda Parlamentar Individual"),
    ("16210003210", "16210003210 - Transferências Fundo a Fundo de Recursos do SUS provenientes do Governo Estadual - Emenda Parlamentar Individual"),
    ("27080000000", "27080000000 - Transferência da União Referente à Compensação Financeira de Recursos Minerais"),
    ("27060003110", "27060003110 - Transferência Especial da União - Emenda Parlamentar Individual"),
    ("26210003210", "26210003210 - Transferências Fundo a Fundo de Recursos do SUS provenientes do Governo Estadual - Emenda Parlamentar Individual"),
];
