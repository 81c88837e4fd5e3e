//! Prompt templates for repository questions and commit stories.

use crate::models::StoryStyle;

/// System preamble for repository questions.
pub const ANALYST_SYSTEM_PROMPT: &str = "You are an expert software engineer and GitHub \
repository analyst. You analyze repository metadata and commit history and give detailed, \
accurate answers about codebases, commit patterns, development activity, and technical \
details. Base every answer on the repository data provided; when the data does not cover \
the question, say so.";

/// System preamble for questions spanning several repositories.
pub const ARCHITECT_SYSTEM_PROMPT: &str = "You are an expert software architect and full-stack \
developer. You analyze several connected GitHub repositories and explain how they work \
together: API connections, data flow, shared components, and what it takes to develop across \
them. Base every answer on the repository data provided; when the data does not cover the \
question, say so.";

const STORY_SYSTEM_BASE: &str = "You are a technical writer who turns commit history into \
short, formal project summaries for engineering leads and stakeholders.";

const STORY_CONSTRAINTS: &str = "Use formal, professional language. No storytelling phrases. \
Keep it to at most 200 words and present facts and achievements plainly.";

/// User prompt for a question, wrapping the context document.
pub fn question_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following GitHub repository data, answer the user's question.\n\n\
        ## Repository Data\n\n\
        {context}\n\
        ## Question\n\n\
        {question}\n\n\
        ## Instructions\n\n\
        Give a detailed, helpful answer based on the repository data above. If the question \
        cannot be answered from this data, explain what is missing and what additional data \
        would be needed.\n\n\
        Where relevant, cover:\n\
        - code patterns and development practices\n\
        - commit frequency and patterns\n\
        - technology stack and languages\n\
        - repository activity and health\n\
        - recent changes and trends\n\n\
        Formatting:\n\
        - Use fenced markdown code blocks with a language tag for all code, JSON, \
        configuration, and shell commands (```json, ```bash, ```yaml, ```rust, ...).\n\
        - Use ```text for data-flow diagrams.\n\n\
        Answer clearly and professionally for developers and technical stakeholders.\n"
    )
}

/// User prompt for a question over several repositories.
pub fn multi_question_prompt(context: &str, question: &str) -> String {
    format!(
        "You are analyzing several connected GitHub repositories. Based on the repository \
        data below, answer the user's question.\n\n\
        ## Repository Data\n\n\
        {context}\n\
        ## Question\n\n\
        {question}\n\n\
        ## Instructions\n\n\
        Where relevant, cover:\n\
        1. Project overview and connections: how the projects relate, the architecture they \
        form, integration points and dependencies.\n\
        2. Technical analysis: technology stack across projects, API patterns and data flow, \
        shared components, data models.\n\
        3. Development instructions: integration steps, endpoints, configuration \
        requirements.\n\
        4. Cross-project insights: common conventions, likely issues, scalability.\n\n\
        Formatting:\n\
        - Use fenced markdown code blocks with a language tag for all code, JSON, \
        configuration, and shell commands (```json, ```bash, ```yaml, ```rust, ...).\n\
        - Use ```text for data-flow diagrams.\n\n\
        Make the answer practical for someone who does not know these codebases yet.\n"
    )
}

/// System preamble for a commit story in the given style.
pub fn story_system_prompt(style: StoryStyle) -> String {
    let addition = match style {
        StoryStyle::Narrative => {
            "You present development milestones and achievements as a concise project summary."
        }
        StoryStyle::Technical => {
            "You write technical project reports that explain architectural decisions and \
            codebase evolution in a structured, analytical way."
        }
        StoryStyle::Casual => {
            "You write clear, direct project updates that highlight key progress."
        }
    };
    format!("{STORY_SYSTEM_BASE} {addition} {STORY_CONSTRAINTS}")
}

/// User prompt for a commit story, wrapping the context document.
pub fn story_prompt(context: &str, style: StoryStyle) -> String {
    let instruction = match style {
        StoryStyle::Narrative => {
            "Write a project summary. Present the development timeline and key milestones, \
            focusing on what was accomplished and the value delivered."
        }
        StoryStyle::Technical => {
            "Write a technical project report. Explain how the codebase evolved, which areas \
            changed, and the architectural decisions the commits reveal."
        }
        StoryStyle::Casual => {
            "Write a short project update in plain, direct language highlighting the main \
            achievements."
        }
    };
    format!(
        "Summarize the following repository and commit history.\n\n\
        {instruction}\n\n\
        ## Repository Data\n\n\
        {context}\n\
        ## Requirements\n\n\
        1. Formal, professional language\n\
        2. Short, clear sentences\n\
        3. Development progress and milestones in plain terms\n\
        4. 150-250 words at most\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_prompt_embeds_context_and_question() {
        let prompt = question_prompt("=== REPOSITORY INFORMATION ===\nName: demo\n", "What changed?");
        assert!(prompt.contains("## Repository Data\n\n=== REPOSITORY INFORMATION ===\nName: demo\n"));
        assert!(prompt.contains("## Question\n\nWhat changed?"));
        let data = prompt.find("## Repository Data").unwrap();
        let question = prompt.find("## Question").unwrap();
        let instructions = prompt.find("## Instructions").unwrap();
        assert!(data < question && question < instructions);
    }

    #[test]
    fn multi_question_prompt_orders_sections() {
        let prompt = multi_question_prompt("=== MULTI-PROJECT ANALYSIS ===\n", "How do they connect?");
        let data = prompt.find("## Repository Data\n\n=== MULTI-PROJECT ANALYSIS ===").unwrap();
        let question = prompt.find("## Question\n\nHow do they connect?").unwrap();
        assert!(data < question);
        assert!(prompt.contains("Cross-project insights"));
    }

    #[test]
    fn story_prompts_differ_by_style() {
        let narrative = story_prompt("ctx", StoryStyle::Narrative);
        let technical = story_prompt("ctx", StoryStyle::Technical);
        assert_ne!(narrative, technical);
        assert!(technical.contains("architectural"));
        assert!(story_system_prompt(StoryStyle::Casual).contains("200 words"));
    }
}
