pub mod problem_extractor;
pub mod search_prompt_writer;
pub mod web_researcher;
