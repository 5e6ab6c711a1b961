//! Fixed reply keyboards shown alongside prompts
//!
//! Layouts are static data; the transport only needs the button rows.

/// Button labels, compared against inbound text in one place only
pub mod labels {
    pub const INCOME: &str = "Income";
    pub const EXPENSE: &str = "Expense";
    pub const YES: &str = "Yes";
    pub const NO: &str = "No";
    pub const BACK: &str = "Back";

    /// The category whose subcategory replaces the free-text comment
    pub const MANDATORY_SPENDING: &str = "Mandatory spending";

    pub const EXPENSE_CATEGORIES: [&str; 11] = [
        MANDATORY_SPENDING,
        "Groceries",
        "Eating out",
        "Transport",
        "Household goods",
        "Personal items",
        "Medicine",
        "Cigarettes",
        "Cats",
        "Coffee",
        "Entertainment",
    ];

    pub const MANDATORY_SUBCATEGORIES: [&str; 8] = [
        "Utilities",
        "Credit",
        "English lessons",
        "Phone plan",
        "Telegram Premium",
        "Internet",
        "Yandex subscription",
        "Bank fees",
    ];

    pub fn is_expense_category(text: &str) -> bool {
        EXPENSE_CATEGORIES.contains(&text)
    }
}

use labels::{BACK, EXPENSE, EXPENSE_CATEGORIES, INCOME, MANDATORY_SUBCATEGORIES, NO, YES};

type Layout = &'static [&'static [&'static str]];

const MAIN_MENU: Layout = &[&[INCOME, EXPENSE]];

const YES_NO: Layout = &[&[YES, NO]];

const EXPENSE_CATEGORY_MENU: Layout = &[
    &[EXPENSE_CATEGORIES[0]],
    &[EXPENSE_CATEGORIES[1], EXPENSE_CATEGORIES[2]],
    &[EXPENSE_CATEGORIES[3], EXPENSE_CATEGORIES[4]],
    &[EXPENSE_CATEGORIES[5], EXPENSE_CATEGORIES[6]],
    &[
        EXPENSE_CATEGORIES[7],
        EXPENSE_CATEGORIES[8],
        EXPENSE_CATEGORIES[9],
    ],
    &[EXPENSE_CATEGORIES[10]],
    &[BACK],
];

const SUBCATEGORY_MENU: Layout = &[
    &[MANDATORY_SUBCATEGORIES[0]],
    &[MANDATORY_SUBCATEGORIES[1]],
    &[MANDATORY_SUBCATEGORIES[2]],
    &[MANDATORY_SUBCATEGORIES[3]],
    &[MANDATORY_SUBCATEGORIES[4]],
    &[MANDATORY_SUBCATEGORIES[5]],
    &[MANDATORY_SUBCATEGORIES[6]],
    &[MANDATORY_SUBCATEGORIES[7]],
    &[BACK],
];

const BACK_ONLY: Layout = &[&[BACK]];

/// One of the five fixed keyboards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    MainMenu,
    YesNo,
    ExpenseCategories,
    MandatorySubcategories,
    BackOnly,
}

impl Keyboard {
    /// Button rows, top to bottom
    pub fn rows(self) -> Layout {
        match self {
            Keyboard::MainMenu => MAIN_MENU,
            Keyboard::YesNo => YES_NO,
            Keyboard::ExpenseCategories => EXPENSE_CATEGORY_MENU,
            Keyboard::MandatorySubcategories => SUBCATEGORY_MENU,
            Keyboard::BackOnly => BACK_ONLY,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn contains(self, label: &str) -> bool {
        self.rows().iter().any(|row| row.contains(&label))
    }
}
