use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub next_offset: i64,
    pub prev_offset: i64,
    pub page_list: Vec<(String, i64)>,
    pub message: Option<String>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() {
            return Self::no_rows();
        }
        let last_offset = ((total_rows - 1) / page_size) * page_size;
        let next_offset = (current_offset + page_size).min(last_offset);
        let prev_offset = (current_offset - page_size).max(0);

        let page_count = (total_rows + page_size - 1) / page_size;
        let current_page = current_offset / page_size;

        let page_list = (0..page_count)
            .map(|n| {
                let page = if n == current_page {
                    String::from("...")
                } else {
                    format!("{}", n + 1)
                };

                (page, n * page_size)
            })
            .collect();

        Self {
            rows,
            total_rows,
            next_offset,
            prev_offset,
            page_list,
            message: Some(format!(
                "{} - {} / {}",
                current_offset,
                (current_offset + page_size).min(total_rows),
                total_rows
            )),
        }
    }

    pub fn no_rows() -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            next_offset: 0,
            prev_offset: 0,
            page_list: vec![(String::from("1"), 0)],
            message: Some(String::from("No results")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rows_yield_no_results() {
        let page: PageContext<i32> = PageContext::from_rows(vec![], 0, 6, 0);
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.page_list, vec![(String::from("1"), 0)]);
        assert_eq!(page.message.as_deref(), Some("No results"));
    }

    #[test]
    fn single_page_stays_in_place() {
        let page = PageContext::from_rows(vec![1, 2, 3], 3, 6, 0);
        assert_eq!(page.next_offset, 0);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.page_list.len(), 1);
        assert_eq!(page.message.as_deref(), Some("0 - 3 / 3"));
    }

    #[test]
    fn middle_page_navigates_both_ways() {
        let rows: Vec<i32> = (0..6).collect();
        let page = PageContext::from_rows(rows, 20, 6, 6);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.next_offset, 12);
        // 20 rows over page size 6 make four pages, current one masked
        assert_eq!(page.page_list.len(), 4);
        assert_eq!(page.page_list[1].0, "...");
        assert_eq!(page.page_list[3], (String::from("4"), 18));
    }

    #[test]
    fn last_page_does_not_overrun() {
        let page = PageContext::from_rows(vec![1, 2], 20, 6, 18);
        assert_eq!(page.next_offset, 18);
        assert_eq!(page.prev_offset, 12);
        assert_eq!(page.message.as_deref(), Some("18 - 20 / 20"));
    }
}
