//! Built-in utility tools: calculator, code analyzer, simulated weather,
//! and sample-file generation. None of these touch the network.

use async_trait::async_trait;
use rand::Rng;

use super::{Tool, ToolError};

fn required_str<'a>(input: &'a serde_json::Value, field: &str) -> Result<&'a str, ToolError> {
    input[field]
        .as_str()
        .ok_or_else(|| ToolError::InvalidInput(format!("missing required field '{field}'")))
}

/// Safe arithmetic evaluator. Only numbers and basic operators are accepted;
/// there is no expression language beyond `+ - * /` and parentheses.
pub struct Calculator;

const ALLOWED_CHARS: &str = "0123456789+-*/.() ";

impl Calculator {
    fn evaluate(expression: &str) -> Result<String, String> {
        if expression.contains('%') {
            return Err(
                "Use decimal form instead of %. For example: '15/100 * 2500' instead of '15% * 2500'"
                    .to_string(),
            );
        }
        if !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
            return Err(
                "Invalid characters in expression. Only numbers and basic operators \
                 (+, -, *, /, parentheses) are allowed."
                    .to_string(),
            );
        }

        let mut parser = ExprParser::new(expression);
        let value = parser.parse_expr()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(format!("unexpected input at position {}", parser.pos));
        }
        if !value.is_finite() {
            return Err("result is not a finite number (division by zero?)".to_string());
        }

        // Integer arithmetic renders as an integer; anything involving
        // division or decimals keeps its fractional form (375.0, 2.5, ...).
        // The integer form is only safe while the value survives the round
        // trip through i64; past that the cast saturates.
        let as_int = value as i64;
        let text = if value.fract() == 0.0
            && as_int as f64 == value
            && !expression.contains('/')
            && !expression.contains('.')
        {
            format!("{as_int}")
        } else {
            format!("{value:?}")
        };
        Ok(text)
    }
}

/// Recursive-descent parser over `+ - * /`, unary minus, and parentheses.
struct ExprParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn parse_expr(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_factor()?;
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.parse_factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    value /= self.parse_factor()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_factor(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.parse_factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.parse_expr()?;
                self.skip_whitespace();
                if self.peek() != Some(b')') {
                    return Err("missing closing parenthesis".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.parse_number(),
            Some(c) => Err(format!("unexpected character '{}'", c as char)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn parse_number(&mut self) -> Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or("");
        text.parse::<f64>()
            .map_err(|_| format!("invalid number '{text}'"))
    }
}

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations safely. \
         Pass an expression like '2 + 3 * 4' or '15/100 * 2500'."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Mathematical expression to evaluate (e.g., '15/100 * 2500')"
                }
            },
            "required": ["expression"]
        })
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let expression = required_str(input, "expression")?;
        match Self::evaluate(expression) {
            Ok(value) => Ok(format!("Result: {value}")),
            Err(e) => Err(ToolError::Failed(format!(
                "Error calculating '{expression}': {e}"
            ))),
        }
    }
}

/// Basic static code review: structure counts and simple heuristics.
pub struct CodeAnalyzer;

#[async_trait]
impl Tool for CodeAnalyzer {
    fn name(&self) -> &str {
        "code_analyzer"
    }

    fn description(&self) -> &str {
        "Analyze a code snippet for basic structure and provide simple feedback."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Code snippet to analyze"
                },
                "language": {
                    "type": "string",
                    "description": "Programming language (default: python)"
                }
            },
            "required": ["code"]
        })
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let code = required_str(input, "code")?;
        let language = input["language"].as_str().unwrap_or("python");

        let lines = code.lines().count();
        let characters = code.len();
        let contains_functions = match language {
            "python" => code.contains("def "),
            "rust" => code.contains("fn "),
            _ => code.contains("function "),
        };
        let contains_classes = match language {
            "python" => code.contains("class "),
            "rust" => code.contains("struct ") || code.contains("impl "),
            _ => code.contains("class "),
        };
        let contains_imports = match language {
            "python" => code
                .lines()
                .any(|l| l.trim_start().starts_with("import ") || l.trim_start().starts_with("from ")),
            "rust" => code.lines().any(|l| l.trim_start().starts_with("use ")),
            _ => code.contains("import "),
        };

        Ok(format!(
            "Code Analysis for {language}:\n\
             - Lines of code: {lines}\n\
             - Total characters: {characters}\n\
             - Contains functions: {contains_functions}\n\
             - Contains classes: {contains_classes}\n\
             - Contains imports: {contains_imports}"
        ))
    }
}

/// Simulated weather report. Demo data only; a production deployment would
/// call a real weather API here.
pub struct WeatherInfo;

const CONDITIONS: &[&str] = &["Sunny", "Cloudy", "Rainy", "Partly Cloudy", "Windy"];

#[async_trait]
impl Tool for WeatherInfo {
    fn name(&self) -> &str {
        "weather_info"
    }

    fn description(&self) -> &str {
        "Get weather information for a location (simulated demo data)."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or location name"
                }
            },
            "required": ["location"]
        })
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let location = required_str(input, "location")?;
        let mut rng = rand::thread_rng();
        let temperature: i32 = rng.gen_range(15..=35);
        let condition = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
        let humidity: i32 = rng.gen_range(40..=80);
        let wind: i32 = rng.gen_range(5..=25);

        Ok(format!(
            "Weather for {location} (Demo Data):\n\
             - Temperature: {temperature}°C\n\
             - Condition: {condition}\n\
             - Humidity: {humidity}%\n\
             - Wind Speed: {wind} km/h\n\
             Note: This is simulated data for demonstration purposes."
        ))
    }
}

/// Generates sample file content (csv, json, python, markdown) from a short
/// description.
pub struct FileContentGenerator;

#[async_trait]
impl Tool for FileContentGenerator {
    fn name(&self) -> &str {
        "file_content_generator"
    }

    fn description(&self) -> &str {
        "Generate sample file content for a given file type (csv, json, python, markdown)."
    }

    fn schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_type": {
                    "type": "string",
                    "description": "Type of file (csv, json, python, markdown)"
                },
                "content_description": {
                    "type": "string",
                    "description": "Description of what the file should contain"
                }
            },
            "required": ["file_type", "content_description"]
        })
    }

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError> {
        let file_type = required_str(input, "file_type")?;
        let description = required_str(input, "content_description")?;

        let content = match file_type.to_lowercase().as_str() {
            "csv" => format!(
                "# Sample CSV for: {description}\n\
                 name,age,city,score\n\
                 Alice,25,New York,85\n\
                 Bob,30,London,92\n\
                 Charlie,35,Tokyo,78\n\
                 Diana,28,Paris,88"
            ),
            "json" => {
                let sample = serde_json::json!({
                    "description": description,
                    "data": [
                        {"id": 1, "name": "Item 1", "value": 100},
                        {"id": 2, "name": "Item 2", "value": 250},
                        {"id": 3, "name": "Item 3", "value": 175}
                    ],
                    "metadata": {
                        "created": chrono::Utc::now().to_rfc3339(),
                        "version": "1.0"
                    }
                });
                serde_json::to_string_pretty(&sample)
                    .map_err(|e| ToolError::Failed(e.to_string()))?
            }
            "python" => format!(
                "\"\"\"\n{description}\n\"\"\"\n\n\
                 def main():\n    \
                     \"\"\"Main function for {description}\"\"\"\n    \
                     data = [1, 2, 3, 4, 5]\n    \
                     result = process_data(data)\n    \
                     print(f\"Result: {{result}}\")\n\n\
                 def process_data(data):\n    \
                     \"\"\"Process the input data\"\"\"\n    \
                     return sum(data)\n\n\
                 if __name__ == \"__main__\":\n    \
                     main()\n"
            ),
            "markdown" => format!(
                "# {description}\n\n\
                 ## Overview\n\
                 This document covers {lower}.\n\n\
                 ## Key Points\n\
                 - Point 1: Important information\n\
                 - Point 2: Additional details\n\
                 - Point 3: Summary notes\n\n\
                 ## Conclusion\n\
                 This covers the basics of {lower}.\n",
                lower = description.to_lowercase()
            ),
            other => format!(
                "Sample content for {other} file:\n{description}\n\nGenerated on: {}",
                chrono::Utc::now().to_rfc3339()
            ),
        };

        Ok(content)
    }
}
