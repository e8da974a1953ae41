//! Processing related to visual information.
//!

pub mod camera;
pub mod classifier;

/// Waste categories, numbered as the classifiers report them.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Rubbish,
    Recyclable,
    Organics,
    Ecowaste,
}

/// Convert between category numbers, names and categories.
///
impl Category {
    pub const ALL: [Category; 4] = [
        Category::Rubbish,
        Category::Recyclable,
        Category::Organics,
        Category::Ecowaste,
    ];

    pub fn from_u8(i: u8) -> Option<Category> {
        match i {
            1 => Some(Category::Rubbish),
            2 => Some(Category::Recyclable),
            3 => Some(Category::Organics),
            4 => Some(Category::Ecowaste),
            _ => None,
        }
    }

    pub fn to_u8(&self) -> u8 {
        match self {
            Category::Rubbish => 1,
            Category::Recyclable => 2,
            Category::Organics => 3,
            Category::Ecowaste => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Rubbish => "Rubbish",
            Category::Recyclable => "Recyclable",
            Category::Organics => "Organics",
            Category::Ecowaste => "Ecowaste",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(s: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_conversion_test() {
        assert_eq!(Category::from_u8(3), Some(Category::Organics));
        assert_eq!(Category::from_u8(0), None);
        assert_eq!(Category::from_u8(5), None);
        for c in Category::ALL {
            assert_eq!(Category::from_u8(c.to_u8()), Some(c));
            assert_eq!(Category::from_name(c.name()), Some(c));
        }
        assert_eq!(Category::from_name(" recyclable\n"), Some(Category::Recyclable));
        assert_eq!(Category::from_name("glass"), None);
    }
}
