//! 标识符解析
//!
//! 输入是混合的用户 ID 与邮箱字符串。每个标识符只分类一次：能解析为整数即为 ID，
//! 否则视为邮箱。所有 ID 合并为一次主键查询，所有邮箱合并为一次邮箱查询。
//!
//! 未匹配的标识符是数据而非错误，按"先 ID 后邮箱、类内保持输入顺序"返回。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::User;
use crate::repository::UserDirectory;

/// 分类后的标识符
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Id(i64),
    Email(String),
}

impl Identifier {
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Email(trimmed.to_string()),
        }
    }
}

/// 保留原始输入的标识符，未匹配时原样返回给调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub raw: String,
    pub identifier: Identifier,
}

/// 按输入顺序分类所有标识符
pub fn classify(tokens: &[String]) -> Vec<Token> {
    tokens
        .iter()
        .map(|raw| Token {
            raw: raw.clone(),
            identifier: Identifier::parse(raw),
        })
        .collect()
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// 按 ID 去重后的用户
    pub users: Vec<User>,
    /// 未匹配的原始标识符
    pub invalid_identifiers: Vec<String>,
    /// 匹配到用户的标识符个数（含重复）
    pub matched_tokens: usize,
}

impl Resolution {
    /// 由两次集合查询的结果组装解析结果
    pub fn assemble(tokens: &[Token], by_id: Vec<User>, by_email: Vec<User>) -> Self {
        let by_id: HashMap<i64, User> = by_id.into_iter().map(|u| (u.id, u)).collect();
        let by_email: HashMap<String, User> =
            by_email.into_iter().map(|u| (u.email.clone(), u)).collect();

        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        let id_tokens = tokens.iter().filter_map(|t| match &t.identifier {
            Identifier::Id(id) => Some((t, by_id.get(id))),
            Identifier::Email(_) => None,
        });
        let email_tokens = tokens.iter().filter_map(|t| match &t.identifier {
            Identifier::Email(email) => Some((t, by_email.get(email))),
            Identifier::Id(_) => None,
        });

        for (token, user) in id_tokens.chain(email_tokens) {
            match user {
                Some(user) => {
                    resolution.matched_tokens += 1;
                    if seen.insert(user.id) {
                        resolution.users.push(user.clone());
                    }
                }
                None => resolution.invalid_identifiers.push(token.raw.clone()),
            }
        }

        resolution
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn user_ids(&self) -> Vec<i64> {
        self.users.iter().map(|u| u.id).collect()
    }
}

/// 标识符解析器
pub struct IdentifierResolver<D>
where
    D: UserDirectory,
{
    directory: Arc<D>,
}

impl<D> IdentifierResolver<D>
where
    D: UserDirectory,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// 解析标识符，只有存储故障会返回错误
    pub async fn resolve(&self, raw: &[String]) -> Result<Resolution> {
        let tokens = classify(raw);

        let mut ids = Vec::new();
        let mut emails = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut seen_emails = HashSet::new();
        for token in &tokens {
            match &token.identifier {
                Identifier::Id(id) => {
                    if seen_ids.insert(*id) {
                        ids.push(*id);
                    }
                }
                Identifier::Email(email) => {
                    if seen_emails.insert(email.as_str()) {
                        emails.push(email.clone());
                    }
                }
            }
        }

        let by_id = if ids.is_empty() {
            Vec::new()
        } else {
            self.directory.find_by_ids(&ids).await?
        };
        let by_email = if emails.is_empty() {
            Vec::new()
        } else {
            self.directory.find_by_emails(&emails).await?
        };

        let resolution = Resolution::assemble(&tokens, by_id, by_email);
        debug!(
            resolved = resolution.users.len(),
            invalid = resolution.invalid_identifiers.len(),
            "标识符解析完成"
        );
        Ok(resolution)
    }
}
