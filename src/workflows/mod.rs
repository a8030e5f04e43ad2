pub mod agents;
pub mod applications;
pub mod deliveries;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PageRequest {
    fn resolve(self, max_page_size: usize) -> Result<(usize, usize), AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE.min(max_page_size));
        if limit == 0 || limit > max_page_size {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {max_page_size}"
            )));
        }
        Ok((limit, self.offset.unwrap_or(0)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn slice(all: Vec<T>, request: PageRequest, max_page_size: usize) -> Result<Self, AppError> {
        let (limit, offset) = request.resolve(max_page_size)?;
        let total = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();
        Ok(Self {
            items,
            total,
            limit,
            offset,
        })
    }
}

pub(crate) fn require_actor(actor: &str, field: &str) -> Result<String, AppError> {
    let actor = actor.trim();
    if actor.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(actor.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest};

    #[test]
    fn page_reports_total_and_window() {
        let page = Page::slice(
            (0..45).collect::<Vec<_>>(),
            PageRequest {
                limit: Some(10),
                offset: Some(40),
            },
            100,
        )
        .unwrap();
        assert_eq!(page.total, 45);
        assert_eq!(page.items, vec![40, 41, 42, 43, 44]);
    }

    #[test]
    fn oversized_limit_is_rejected() {
        let request = PageRequest {
            limit: Some(500),
            offset: None,
        };
        assert!(Page::slice(vec![1, 2, 3], request, 100).is_err());
    }
}
