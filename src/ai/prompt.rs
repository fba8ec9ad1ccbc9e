use crate::clock;
use crate::models::FilteredArticle;

use super::response::truncate_chars;

/// Article bodies beyond this are cut before they go into a prompt.
const MAX_ARTICLE_CHARS: usize = 10_000;

const SCRIPT_RULES: &str = r#"Writing rules:
- Write in Bahasa Indonesia, formal but conversational, for retail investors,
  traders and business owners.
- Give insight, not a summary: explain what happened, why, and who is affected,
  using the numbers from the source.
- The body is PLAIN TEXT: no markdown, no **bold**, no # headings, no emoji and
  no hashtags. Separate paragraphs with one blank line so they can become slides.
- Hashtags (10-15) belong only in the hashtag field."#;

/// Prompt for one script from one article.
pub fn single_article(item: &FilteredArticle) -> String {
    let article = &item.article;
    format!(
        r##"You are a professional financial analyst writing short educational YouTube videos.

# SOURCE ARTICLE
Title: {title}
URL: {url}
Published: {published}
Category: {category}
Matched keywords: {terms}

Body:
{body}

# TASK
Write one video script of 300-800 words with this structure:
1. Hook (50-80 words) opening with the most striking fact or number.
2. Context and analysis (150-250 words): what happened, why, and the impact.
3. Seven-day outlook (100-200 words) with best, most likely and worst case.
4. Actionable tips (80-150 words), 3-5 tips for different risk profiles.
5. Closing (30-50 words) with the key takeaway and a call to action.

{rules}

# OUTPUT
Reply with exactly one fenced JSON block:
```json
{{
  "title": "catchy, SEO-friendly title of 60-80 characters",
  "hashtags": "#Tag1 #Tag2 ...",
  "description": "2-3 sentence YouTube description",
  "body": "full plain-text script"
}}
```"##,
        title = article.title,
        url = article.url,
        published = clock::format_timestamp(&article.published_at),
        category = item.category,
        terms = item.matched_terms.join(", "),
        body = truncate_chars(&article.body, MAX_ARTICLE_CHARS),
        rules = SCRIPT_RULES,
    )
}

/// Prompt for several scripts drawn from a group of articles.
pub fn batch(items: &[FilteredArticle]) -> String {
    let mut articles = String::new();
    for (i, item) in items.iter().enumerate() {
        let article = &item.article;
        articles.push_str(&format!(
            "\nARTICLE {n}\nID: {id}\nTitle: {title}\nPublished: {published}\nURL: {url}\nCategory: {category}\n\nBody:\n{body}\n\n---\n",
            n = i + 1,
            id = article.id,
            title = article.title,
            published = clock::format_timestamp(&article.published_at),
            url = article.url,
            category = item.category,
            body = truncate_chars(&article.body, MAX_ARTICLE_CHARS),
        ));
    }

    format!(
        r##"You are a professional content creator who turns economic, business and financial
news into educational YouTube videos.

# ARTICLES
{articles}
# TASK
Read every article above and propose 3-5 videos. Each video should combine 2-3
related articles and be a 500-700 word script covering context, analysis,
practical tips, an outlook and a closing call to action.

{rules}

# OUTPUT
Reply with exactly one fenced JSON block. `source_ids` lists the IDs of the
articles each video draws on, taken from the ID lines above.
```json
{{
  "videos": [
    {{
      "title": "catchy title, at most 80 characters",
      "hashtags": "#Tag1 #Tag2 ...",
      "description": "2-3 sentence description",
      "body": "full plain-text script",
      "source_ids": [1, 3]
    }}
  ]
}}
```"##,
        rules = SCRIPT_RULES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::KeywordClassifier;
    use crate::testing::article;

    #[test]
    fn single_prompt_embeds_article_and_classification() {
        let filtered = KeywordClassifier::default()
            .filter_articles(vec![article(7, "Harga Emas Antam Naik")]);
        let prompt = single_article(&filtered[0]);
        assert!(prompt.contains("Title: Harga Emas Antam Naik"));
        assert!(prompt.contains("Category: gold"));
        assert!(prompt.contains("Matched keywords: emas"));
        assert!(prompt.contains("\"body\""));
    }

    #[test]
    fn batch_prompt_lists_every_id() {
        let filtered = KeywordClassifier::default().filter_articles(vec![
            article(3, "IHSG Dibuka Menguat"),
            article(9, "Rupiah Melemah"),
        ]);
        let prompt = batch(&filtered);
        assert!(prompt.contains("ARTICLE 1\nID: 3"));
        assert!(prompt.contains("ARTICLE 2\nID: 9"));
        assert!(prompt.contains("\"videos\""));
    }

    #[test]
    fn long_bodies_are_cut() {
        let mut a = article(1, "Saham Bank");
        a.body = "x".repeat(MAX_ARTICLE_CHARS + 500);
        let filtered = KeywordClassifier::default().filter_articles(vec![a]);
        let prompt = single_article(&filtered[0]);
        assert!(!prompt.contains(&"x".repeat(MAX_ARTICLE_CHARS + 1)));
        assert!(prompt.contains(&"x".repeat(MAX_ARTICLE_CHARS)));
    }
}
