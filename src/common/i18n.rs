// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;

pub const DEFAULT_LANG: &str = "pt";

// Catálogos embutidos no binário; o deploy não precisa carregar arquivos.
const CATALOGS: &[(&str, &str)] = &[
    ("pt", include_str!("../../locales/pt.json")),
    ("en", include_str!("../../locales/en.json")),
];

type Catalog = HashMap<String, String>;

#[derive(Clone, Debug)]
pub struct I18nStore {
    catalogs: Arc<HashMap<String, Catalog>>,
}

impl I18nStore {
    pub fn load_embedded() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let catalog: Catalog = serde_json::from_str(raw)
                .with_context(|| format!("catálogo de idioma '{lang}' inválido"))?;
            catalogs.insert(lang.to_string(), catalog);
        }
        Ok(Self {
            catalogs: Arc::new(catalogs),
        })
    }

    /// Busca `key` no idioma pedido, cai para o idioma padrão e, por último,
    /// devolve a própria chave. `{nome}` é substituído pelos argumentos.
    pub fn translate(&self, lang: &str, key: &str, args: &[(&str, String)]) -> String {
        let template = self
            .lookup(lang, key)
            .or_else(|| self.lookup(DEFAULT_LANG, key))
            .unwrap_or(key);

        args.iter().fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), value)
        })
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<&str> {
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_share_the_same_keys() {
        let store = I18nStore::load_embedded().unwrap();
        let pt = &store.catalogs["pt"];
        let en = &store.catalogs["en"];

        let mut missing: Vec<_> = pt.keys().filter(|k| !en.contains_key(*k)).collect();
        missing.extend(en.keys().filter(|k| !pt.contains_key(*k)));

        assert!(missing.is_empty(), "chaves sem tradução: {missing:?}");
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::load_embedded().unwrap();

        assert_eq!(
            store.translate("de", "invalid_credentials", &[]),
            store.translate("pt", "invalid_credentials", &[])
        );
    }

    #[test]
    fn placeholders_are_replaced() {
        let store = I18nStore::load_embedded().unwrap();
        let text = store.translate("en", "coupon_not_redeemable", &[("status", "used".into())]);

        assert!(text.contains("used"));
        assert!(!text.contains("{status}"));
    }

    #[test]
    fn missing_key_returns_the_key() {
        let store = I18nStore::load_embedded().unwrap();
        assert_eq!(store.translate("pt", "does.not.exist", &[]), "does.not.exist");
    }
}
