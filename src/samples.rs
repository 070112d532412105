/// Opening of "Alice's Adventures in Wonderland" (Lewis Carroll, 1865), used
/// by the "try an example" flows.
pub const EXAMPLE_TITLE: &str = "Alice's Adventures in Wonderland";

pub const EXAMPLE_TEXT: &str = "\
# Alice's Adventures in Wonderland

Alice was beginning to get very tired of sitting by her sister on the bank, and of having nothing to do: \
once or twice she had peeped into the book her sister was reading, but it had no pictures or conversations in it, \
\"and what is the use of a book,\" thought Alice \"without pictures or conversations?\"

So she was considering in her own mind (as well as she could, for the hot day made her feel very sleepy and stupid), \
whether the pleasure of making a daisy-chain would be worth the trouble of getting up and picking the daisies, \
when suddenly a White Rabbit with pink eyes ran close by her.

There was nothing so very remarkable in that; nor did Alice think it so very much out of the way to hear the Rabbit say to itself, \
\"Oh dear! Oh dear! I shall be late!\" But when the Rabbit actually took a watch out of its waistcoat-pocket, \
and looked at it, and then hurried on, Alice started to her feet, and burning with curiosity, she ran across the field after it.

In another moment down went Alice after it, never once considering how in the world she was to get out again.

Either the well was very deep, or she fell very slowly, for she had plenty of time as she went down to look about her \
and to wonder what was going to happen next. She looked at the sides of the well, and noticed that they were filled \
with cupboards and book-shelves; here and there she saw maps and pictures hung upon pegs.

Down, down, down. Would the fall never come to an end? Suddenly, thump! thump! down she came upon a heap of sticks and dry leaves, \
and the fall was over. Before her was another long passage, and the White Rabbit was still in sight, hurrying down it.
";

pub fn example_text() -> String {
    EXAMPLE_TEXT.to_owned()
}
