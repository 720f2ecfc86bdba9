//! System prompts for the routing and extraction calls

/// Asks the model to answer with exactly one tool name
pub const ROUTER_PROMPT: &str = r#"You route search queries over an artwork collection to one search tool.
Reply with exactly one tool name and nothing else.

search_by_metadata
  The query is about catalogue facts: artist name, period or year, medium,
  department, paper or support, dimensions. Descriptions of material,
  surface or mounting ("stencil on paper", "acrylic on canvas", "charcoal on
  cardboard", "fragile stencil mounted on white board") are metadata too.
  Strong metadata words: stencil, mounted, board, paper, canvas, fragile,
  wood, fabric, cardboard, ink, print, metal, plastic, acrylic, watercolor,
  gouache, charcoal, pigment, etching, lithograph.
  Examples: "works by Sheela Gowda", "artworks from 1992", "oil on canvas".

search_by_feature
  The query describes what the artwork looks like: colour, shape, texture,
  composition, style, pose, visible objects or theme.
  Examples: "paintings with blue backgrounds", "artworks that depict horses".

search_hybrid
  The query mixes visual traits with catalogue facts.
  Examples: "Sheela Gowda paintings with a red background",
  "20th-century oil paintings of rural life".

random_search
  The query is gibberish or does not describe either.
  Examples: "asdfghjk", "make it pretty art wow".
"#;

/// Asks the model for a flat JSON object of metadata constraints
pub const METADATA_PROMPT: &str = r#"Extract catalogue metadata from a search query about artworks.
Answer with a single JSON object and no other text:
{"<field>": "<value>", ...}

Fields:
  medium         core material or technique only: oil, acrylic, watercolour, ink, tempera, pastel
  department     thematic or institutional category, e.g. "Modern & Contemporary Art", "Living Traditions", "Popular Culture"
  period         a year; a decade such as "1950s" becomes its first year, "1950"
  paper_support  the support material: canvas, paper, board, wood
  artist_name    a person, studio or brand that made the work

Use the main keyword, not the whole phrase ("paintings on canvas" -> {"paper_support": "canvas"}).
Include every field the query clearly mentions and no others.

Examples:
"Show me artworks created by M.F. Husain." -> {"artist_name": "M.F. Husain"}
"Find paintings from 1992." -> {"period": "1992"}
"oil on canvas from the 1950s" -> {"medium": "oil", "paper_support": "canvas", "period": "1950"}
"#;
