use std::collections::HashMap;

use crate::{
    error::{Error, QueryError},
    schema::{CartIngredientRow, ShoppingListRow, Uuid},
    SHOPPING_LIST_FILE_NAME,
};

use sqlx::{Pool, Postgres};
use warp::Reply;

/// Every ingredient association of every recipe currently in the cart,
/// one row per association.
pub async fn list_cart_ingredients(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<CartIngredientRow>, Error> {
    let rows: Vec<CartIngredientRow> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM cart_items c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| QueryError::from(e).into())?;

    Ok(rows)
}

/// Groups cart lines by (name, measurement unit), sums the amounts and
/// orders the groups by ingredient name. Equivalent entries coming from
/// different recipes merge into one line.
pub fn aggregate_shopping_list(rows: Vec<CartIngredientRow>) -> Vec<ShoppingListRow> {
    let mut totals: HashMap<(String, String), i64> = HashMap::new();

    rows.into_iter().for_each(|row| {
        let key = (row.name, row.measurement_unit);
        match totals.get_mut(&key) {
            Some(total) => *total += row.amount as i64,
            None => {
                totals.insert(key, row.amount as i64);
            }
        }
    });

    let mut list: Vec<ShoppingListRow> = totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListRow {
            name,
            measurement_unit,
            total_amount,
        })
        .collect();

    list.sort_by(|a, b| {
        (&a.name, &a.measurement_unit).cmp(&(&b.name, &b.measurement_unit))
    });
    list
}

/// The shopping list is recomputed from the cart on every call, there is
/// no cached copy that could go stale.
pub async fn build_shopping_list(
    user_id: Uuid,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListRow>, Error> {
    let rows = list_cart_ingredients(user_id, pool).await?;

    Ok(aggregate_shopping_list(rows))
}

/// Flat text rendering, one ingredient per line.
pub fn render_shopping_list(rows: &[ShoppingListRow]) -> String {
    rows.iter()
        .map(|row| format!("{} ({}) - {}", row.name, row.measurement_unit, row.total_amount))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Wraps the rendered list as a downloadable plain-text attachment.
pub fn as_attachment(body: String) -> impl Reply {
    let reply = warp::reply::with_header(body, "Content-Type", "text/plain; charset=utf-8");

    warp::reply::with_header(
        reply,
        "Content-Disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILE_NAME}\""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, unit: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn merges_equivalent_lines_across_recipes() {
        // cart with R1 (flour 200) and R2 (flour 100, sugar 50)
        let list = aggregate_shopping_list(vec![
            row("мука", "г", 200),
            row("мука", "г", 100),
            row("сахар", "г", 50),
        ]);

        assert_eq!(
            list,
            vec![
                ShoppingListRow {
                    name: String::from("мука"),
                    measurement_unit: String::from("г"),
                    total_amount: 300,
                },
                ShoppingListRow {
                    name: String::from("сахар"),
                    measurement_unit: String::from("г"),
                    total_amount: 50,
                },
            ]
        );
    }

    #[test]
    fn same_name_with_different_units_stays_separate() {
        let list = aggregate_shopping_list(vec![
            row("молоко", "мл", 500),
            row("молоко", "л", 1),
        ]);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].measurement_unit, "л");
        assert_eq!(list[1].measurement_unit, "мл");
    }

    #[test]
    fn orders_by_ingredient_name() {
        let list = aggregate_shopping_list(vec![
            row("яйцо", "шт.", 2),
            row("мука", "г", 100),
            row("сахар", "г", 10),
        ]);

        let names: Vec<&str> = list.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["мука", "сахар", "яйцо"]);
    }

    #[test]
    fn empty_cart_renders_to_nothing() {
        assert_eq!(aggregate_shopping_list(vec![]), vec![]);
        assert_eq!(render_shopping_list(&[]), "");
    }

    #[test]
    fn renders_one_line_per_ingredient() {
        let list = aggregate_shopping_list(vec![row("мука", "г", 300), row("сахар", "г", 50)]);

        assert_eq!(
            render_shopping_list(&list),
            "мука (г) - 300\nсахар (г) - 50"
        );
    }
}
