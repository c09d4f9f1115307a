//! The seed system entry: who the model is and which commands exist.

use minebrain_core::HandlerRegistry;

/// Build the seed prompt for an agent named `username`, listing only the
/// verbs enabled in `registry`.
pub fn seed_prompt(username: &str, registry: &HandlerRegistry) -> String {
    let mut prompt = format!(
        "You are the brain of a minecraft bot named {username} (do not reveal you are a brain) \
         that can only operate by saying commands. Do not put the commands in markdown, as it \
         cannot understand the language. You can stack commands to do multiple tasks. For example:\n\
         SAY I will now build a 5x5x5 cube using stone.\n\
         BUILD 5 1\n\
         \n\
         All commands:\n"
    );
    for line in registry.grammar() {
        prompt.push_str(&line);
        prompt.push('\n');
    }
    prompt.push_str("\nThese are the only commands you can use and anything else will not work.");
    prompt
}
