//! Category filtering and pagination over a fetched blog listing.

use crate::models::Blog;

// ============================================================================
// Constants
// ============================================================================

/// Blogs shown per page
pub const BLOGS_PER_PAGE: usize = 9;

/// Widest run of page numbers offered at once
const MAX_VISIBLE_PAGES: usize = 5;

/// Built-in browse categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    PhysicsMathematics,
    Innovation,
    Space,
    Technology,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::PhysicsMathematics,
        Category::Innovation,
        Category::Space,
        Category::Technology,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Category::PhysicsMathematics => "Physics & Mathematics",
            Category::Innovation => "Innovation",
            Category::Space => "Space",
            Category::Technology => "Technology",
        }
    }

    /// Case-insensitive lookup by title
    pub fn from_title(title: &str) -> Option<Self> {
        let title = title.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.title().eq_ignore_ascii_case(title))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Loose tag/category match: equal, "&" spelled "and", or either contains
/// the other, all ignoring case. Blank tags never match.
pub fn tag_matches_category(tag: &str, category: &str) -> bool {
    let tag = tag.trim().to_lowercase();
    let category = category.trim().to_lowercase();
    if tag.is_empty() || category.is_empty() {
        return false;
    }
    tag == category
        || tag == category.replace(" & ", " and ")
        || tag.contains(&category)
        || category.contains(&tag)
}

pub fn blog_in_category(blog: &Blog, category: &str) -> bool {
    blog.tags.iter().any(|tag| tag_matches_category(tag, category))
}

/// Page numbers to offer around `current`: at most five, kept in range.
pub fn visible_page_numbers(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let (start, end) = if total_pages <= MAX_VISIBLE_PAGES {
        (1, total_pages)
    } else if current <= 3 {
        (1, MAX_VISIBLE_PAGES)
    } else if current + 2 >= total_pages {
        (total_pages - (MAX_VISIBLE_PAGES - 1), total_pages)
    } else {
        (current - 2, current + 2)
    };
    (start..=end).collect()
}

/// A fetched listing with the reader's category and page selection.
#[derive(Debug, Clone)]
pub struct BlogFeed {
    blogs: Vec<Blog>,
    category: Option<String>,
    page: usize,
}

impl BlogFeed {
    pub fn new(blogs: Vec<Blog>) -> Self {
        Self {
            blogs,
            category: None,
            page: 1,
        }
    }

    /// Filter by category; `None` or a blank name clears the filter.
    pub fn select_category(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self.page = 1;
    }

    /// Selecting the active category again clears it
    pub fn toggle_category(&mut self, category: &str) {
        if self.selected_category() == Some(category.trim()) {
            self.select_category(None);
        } else {
            self.select_category(Some(category));
        }
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn visible(&self) -> Vec<&Blog> {
        match self.category {
            Some(ref category) => self
                .blogs
                .iter()
                .filter(|b| blog_in_category(b, category))
                .collect(),
            None => self.blogs.iter().collect(),
        }
    }

    pub fn total_count(&self) -> usize {
        self.visible().len()
    }

    pub fn total_pages(&self) -> usize {
        self.total_count().div_ceil(BLOGS_PER_PAGE)
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    /// Move to `page`, clamped to the available pages
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
    }

    pub fn page_items(&self) -> Vec<&Blog> {
        self.visible()
            .into_iter()
            .skip((self.page - 1) * BLOGS_PER_PAGE)
            .take(BLOGS_PER_PAGE)
            .collect()
    }

    pub fn page_numbers(&self) -> Vec<usize> {
        visible_page_numbers(self.page, self.total_pages())
    }
}
