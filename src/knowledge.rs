use crate::models::{Faq, FaqRecord, KbArticle, KbArticleRecord, KnowledgePayload};

pub fn knowledge_payload(articles: &[KbArticleRecord], faqs: &[FaqRecord]) -> KnowledgePayload {
    KnowledgePayload {
        articles: articles
            .iter()
            .map(|article| KbArticle {
                kb_id: article.kb_id.clone(),
                title: article.title.clone(),
                problem_statement: article.problem_statement.clone(),
                resolution_steps: article.resolution_steps.clone(),
                keywords: article.keywords.clone(),
                panels_affected: article.panels_affected.clone(),
                priority_score: article.priority_score,
                priority_level: article.priority_level.clone(),
                frequency: article.frequency,
            })
            .collect(),
        faqs: faqs
            .iter()
            .map(|faq| Faq {
                question: faq.question.clone(),
                answer: faq.answer.clone(),
                panel: faq.panel.clone(),
                keywords: faq.keywords.clone(),
            })
            .collect(),
    }
}
