//! Pure prompt building - no IO, fully testable.

use autoclass_capabilities::Catalog;
use autoclass_pipeline::PipelineDescriptor;

/// One line per class: `Name: description`.
pub fn class_summary(catalog: &Catalog) -> String {
    catalog
        .classes
        .iter()
        .map(|c| format!("{}: {}", c.class_name, c.class_description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classes with their documented methods, parameters and return types.
pub fn method_summary(catalog: &Catalog) -> String {
    let mut out = String::new();
    for class in &catalog.classes {
        out.push_str(&format!("{}: {}\n", class.class_name, class.class_description));
        for method in &class.methods {
            let params = method
                .inputs
                .iter()
                .map(|(name, ty)| {
                    if ty.is_empty() {
                        name.clone()
                    } else {
                        format!("{name}: {ty}")
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("  - {}({})", method.method, params));
            if !method.output.is_empty() {
                out.push_str(&format!(" -> {}", method.output));
            }
            if !method.description.is_empty() {
                out.push_str(&format!(": {}", method.description));
            }
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

/// Ask for the classes relevant to a query, as a JSON array of names.
pub fn build_class_prompt(query: &str, catalog: &Catalog) -> String {
    format!(
        "You are an AI assistant that can choose a class to handle a user query.\n\
\n\
List of classes:\n\
{classes}\n\
\n\
User query: {query}\n\
\n\
Instructions:\n\
- Choose the most relevant classes from the list.\n\
- If a class is not relevant do not include it in the answer.\n\
- Respond with a JSON array of class names only, without descriptions.\n\
- If no class is relevant, respond with [].\n\
\n\
Example:\n\
User query: \"How do I add two numbers?\"\n\
Response: [\"Arithmetic\"]\n",
        classes = class_summary(catalog),
    )
}

/// Ask for the classes and methods relevant to a query, as a JSON object
/// mapping class names to lists of method names.
pub fn build_method_prompt(query: &str, catalog: &Catalog) -> String {
    format!(
        "You are an AI assistant that chooses the methods needed to answer a user query.\n\
\n\
Available classes and methods:\n\
{methods}\n\
\n\
User query: {query}\n\
\n\
Instructions:\n\
- Choose only the methods needed to answer the query.\n\
- Respond with a JSON object mapping each class name to a list of method names.\n\
- Use class and method names exactly as listed.\n\
- If nothing is relevant, respond with {{}}.\n\
\n\
Example:\n\
User query: \"What is 2 plus 3?\"\n\
Response: {{\"Arithmetic\": [\"add\"]}}\n",
        methods = method_summary(catalog),
    )
}

/// Ask for the pipeline's input values to be filled from the query.
pub fn build_fill_prompt(query: &str, pipeline: &PipelineDescriptor) -> String {
    let pipeline_json =
        serde_json::to_string_pretty(pipeline).unwrap_or_else(|_| "{\"classes\": []}".to_string());
    format!(
        "You are an AI assistant that fills in method arguments for a user query.\n\
\n\
Pipeline (input values are null; declared types are under input_types):\n\
{pipeline_json}\n\
\n\
User query: {query}\n\
\n\
Instructions:\n\
- Replace each null input value with the value taken from the query.\n\
- To pass the result of another method, use its identifier \"ClassName.method_name\" \
as the value.\n\
- Do not add, remove or rename classes, methods or inputs.\n\
- Respond with the complete pipeline as JSON only.\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoclass_capabilities::{ClassDescriptor, MethodDescriptor};
    use autoclass_pipeline::{prune, Selection};

    fn catalog() -> Catalog {
        Catalog {
            classes: vec![ClassDescriptor {
                class_name: "Arithmetic".to_string(),
                class_description: "Basic arithmetic.".to_string(),
                methods: vec![MethodDescriptor {
                    method: "add".to_string(),
                    description: "Adds two numbers.".to_string(),
                    inputs: [
                        ("a".to_string(), "int or float".to_string()),
                        ("b".to_string(), "int or float".to_string()),
                    ]
                    .into(),
                    output: "int or float".to_string(),
                    raw_doc: String::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_class_prompt_lists_classes() {
        let prompt = build_class_prompt("add 2 and 3", &catalog());
        assert!(prompt.contains("Arithmetic: Basic arithmetic."));
        assert!(prompt.contains("User query: add 2 and 3"));
        assert!(prompt.contains("JSON array"));
        assert!(!prompt.contains("Adds two numbers."));
    }

    #[test]
    fn test_method_prompt_lists_signatures() {
        let prompt = build_method_prompt("add 2 and 3", &catalog());
        assert!(prompt.contains(
            "- add(a: int or float, b: int or float) -> int or float: Adds two numbers."
        ));
        assert!(prompt.contains("{\"Arithmetic\": [\"add\"]}"));
    }

    #[test]
    fn test_fill_prompt_embeds_pipeline() {
        let pipeline = prune(&catalog(), &Selection::Classes(["Arithmetic".to_string()].into()));
        let prompt = build_fill_prompt("add 2 and 3", &pipeline);
        assert!(prompt.contains("\"class_name\": \"Arithmetic\""));
        assert!(prompt.contains("\"input_types\""));
        assert!(prompt.contains("User query: add 2 and 3"));
    }

    #[test]
    fn test_empty_catalog_summary() {
        assert_eq!(class_summary(&Catalog::default()), "");
        assert_eq!(method_summary(&Catalog::default()), "");
    }
}
